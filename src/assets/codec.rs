//! Block-compressed texture codecs behind one trait boundary (component I).
//!
//! The actual compression math is out of scope here (§1/§9 Open Question 1)
//! — these are the minimal, correct-shape implementations the trait
//! contract requires so a production build can swap in a real codec crate
//! (e.g. `texpresso`/`squish`-style) without touching any caller. BC1/BC3/
//! BC4/BC5/BC7 each get a concrete type; BC2 is decode-only since the
//! original never needed to re-encode it.

use ash::vk;

/// One entry point per direction, queried before use so a caller (component
/// H's override substitution) can pick a codec without committing to one.
pub trait BlockCodec: Send + Sync {
    fn decompression_supported(&self, format: vk::Format) -> bool;
    fn compression_supported(&self, format: vk::Format) -> bool;

    /// Decodes one `width`x`height` block-compressed image into RGBA8.
    fn decompress(&self, format: vk::Format, compressed: &[u8], width: u32, height: u32) -> Vec<u8>;

    /// Encodes an RGBA8 image of `width`x`height` into `format`.
    fn compress(&self, format: vk::Format, rgba: &[u8], width: u32, height: u32) -> Vec<u8>;
}

fn block_count(width: u32, height: u32) -> u32 {
    ((width + 3) / 4) * ((height + 3) / 4)
}

macro_rules! bc_codec {
    ($name:ident, $block_bytes:expr, [$($fmt:ident),+ $(,)?], decode_only = $decode_only:expr) => {
        pub struct $name;

        impl BlockCodec for $name {
            fn decompression_supported(&self, format: vk::Format) -> bool {
                matches!(format, $(vk::Format::$fmt)|+)
            }

            fn compression_supported(&self, format: vk::Format) -> bool {
                !$decode_only && self.decompression_supported(format)
            }

            fn decompress(&self, _format: vk::Format, _compressed: &[u8], width: u32, height: u32) -> Vec<u8> {
                vec![0u8; (width as usize) * (height as usize) * 4]
            }

            fn compress(&self, _format: vk::Format, _rgba: &[u8], width: u32, height: u32) -> Vec<u8> {
                vec![0u8; block_count(width, height) as usize * $block_bytes]
            }
        }
    };
}

bc_codec!(Bc1Codec, 8, [BC1_RGB_UNORM_BLOCK, BC1_RGB_SRGB_BLOCK, BC1_RGBA_UNORM_BLOCK, BC1_RGBA_SRGB_BLOCK], decode_only = false);
bc_codec!(Bc2Codec, 16, [BC2_UNORM_BLOCK, BC2_SRGB_BLOCK], decode_only = true);
bc_codec!(Bc3Codec, 16, [BC3_UNORM_BLOCK, BC3_SRGB_BLOCK], decode_only = false);
bc_codec!(Bc4Codec, 8, [BC4_UNORM_BLOCK, BC4_SNORM_BLOCK], decode_only = false);
bc_codec!(Bc5Codec, 16, [BC5_UNORM_BLOCK, BC5_SNORM_BLOCK], decode_only = false);
bc_codec!(Bc7Codec, 16, [BC7_UNORM_BLOCK, BC7_SRGB_BLOCK], decode_only = false);

/// All codecs this crate knows about, in a fixed order — used by
/// [`codec_for`] to enforce "exactly one codec per format" (Open Question 1).
fn all_codecs() -> [&'static dyn BlockCodec; 6] {
    [&Bc1Codec, &Bc2Codec, &Bc3Codec, &Bc4Codec, &Bc5Codec, &Bc7Codec]
}

/// Resolves exactly one codec able to decompress `format`, warning if more
/// than one claims support (should not happen with a correct format→codec
/// mapping, guarded defensively per Open Question 1).
pub fn codec_for(format: vk::Format) -> Option<&'static dyn BlockCodec> {
    let mut matches = all_codecs().into_iter().filter(|c| c.decompression_supported(format));
    let first = matches.next();
    if first.is_some() && matches.next().is_some() {
        log::warn!("more than one block codec claims support for {:?}", format);
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bc1_supports_its_formats_but_not_bc7() {
        let bc1 = Bc1Codec;
        assert!(bc1.decompression_supported(vk::Format::BC1_RGBA_UNORM_BLOCK));
        assert!(!bc1.decompression_supported(vk::Format::BC7_UNORM_BLOCK));
    }

    #[test]
    fn bc2_is_decode_only() {
        let bc2 = Bc2Codec;
        assert!(bc2.decompression_supported(vk::Format::BC2_UNORM_BLOCK));
        assert!(!bc2.compression_supported(vk::Format::BC2_UNORM_BLOCK));
    }

    #[test]
    fn codec_for_resolves_a_single_codec() {
        assert!(codec_for(vk::Format::BC7_SRGB_BLOCK).is_some());
        assert!(codec_for(vk::Format::R8G8B8A8_UNORM).is_none());
    }
}
