//! Shadow framebuffer state, grounded on `CheekyLayer::framebuffer`.

use ash::vk;

#[derive(Debug, Clone)]
pub struct FramebufferState {
    pub attachments: Vec<vk::ImageView>,
    pub width: u32,
    pub height: u32,
}

impl FramebufferState {
    /// # Safety
    /// `info.p_attachments` must point to `info.attachment_count` valid
    /// `VkImageView` handles (true for any `VkFramebufferCreateInfo` the
    /// loader just handed to `vkCreateFramebuffer`).
    pub unsafe fn from_create_info(info: &vk::FramebufferCreateInfo) -> Self {
        let attachments = if info.p_attachments.is_null() {
            Vec::new()
        } else {
            std::slice::from_raw_parts(info.p_attachments, info.attachment_count as usize).to_vec()
        };
        FramebufferState { attachments, width: info.width, height: info.height }
    }
}
