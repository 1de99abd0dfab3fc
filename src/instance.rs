//! Component L: per-`VkInstance` bootstrap, grounded on
//! `CheekyLayer::instance`/`CheekyLayer_CreateInstance`'s construction
//! sequence (config load, logger open, override cache scan, rule file
//! parse, plugin load, `init` selector fire).

use std::collections::HashMap;
use std::ffi::CStr;
use std::sync::{Arc, Mutex};

use ash::vk;
use log::info;

use crate::assets::shader_compile::{CompileCache, ShaderCompiler, UnsupportedCompiler};
use crate::config::Config;
use crate::hash::OverrideCache;
use crate::ipc::FileDescriptor;
use crate::logger::InstanceLogger;
use crate::rules::{execute_rules, AdditionalInfo, Context, GlobalRuleContext, Rule, SelectorType};
use crate::Error;

pub struct Instance {
    pub handle: vk::Instance,
    pub ash_instance: ash::Instance,
    /// The next layer down's `vkGetInstanceProcAddr`, captured off the
    /// loader's link-info chain at `vkCreateInstance` time. `GetInstanceProcAddr`
    /// forwards any query this layer does not intercept through here, exactly
    /// as the original's saved `fpGetInstanceProcAddr` does.
    pub next_get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pub config: Config,
    pub logger: InstanceLogger,
    pub rules: Vec<Rule>,
    pub globals: Mutex<GlobalRuleContext>,
    pub override_cache: OverrideCache,
    pub fd_registry: Mutex<HashMap<String, Arc<dyn FileDescriptor>>>,
    plugins: Mutex<Vec<libloading::Library>>,

    /// GLSL-override compile cache, shared across every `vkCreateShaderModule`
    /// call on every device of this instance, matching the original's
    /// process-wide `shaderCache` map.
    pub shader_compile_cache: Mutex<CompileCache>,
    pub shader_compiler: Box<dyn ShaderCompiler>,
}

impl Instance {
    /// Wraps an already-created `VkInstance` (the next-layer `vkCreateInstance`
    /// call happens in `lib.rs`'s `CreateInstance` trampoline, same split as
    /// the original's `CheekyLayer_CreateInstance`) and runs the rest of the
    /// bootstrap sequence: config, logger, override cache, rules, plugins.
    pub fn bootstrap(
        entry: &ash::Entry,
        handle: vk::Instance,
        app_name: &str,
        engine_name: &str,
        next_get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    ) -> Result<Arc<Instance>, Error> {
        let ash_instance = unsafe { ash::Instance::load(entry.static_fn(), handle) };

        let config_path = std::env::var("WIRETAP_CONFIG").unwrap_or_default();
        let config_source = std::fs::read_to_string(&config_path).unwrap_or_default();
        let config = Config::parse(&config_source);

        let pid = std::process::id();
        let log_path = crate::logger::expand_path_template(config.get("logFile"), pid, handle.as_raw());
        let logger = InstanceLogger::open(&log_path, log::Level::Warn)?;
        logger.line(&format!(
            "wiretap bootstrapped for application \"{}\" using engine \"{}\" (pid {})",
            app_name, engine_name, pid
        ));
        info!("wiretap: instance {:#x} bootstrapped ({}/{})", handle.as_raw(), app_name, engine_name);

        let override_cache = OverrideCache::load(std::path::Path::new(config.get("overrideDirectory")));

        let rule_source = std::fs::read_to_string(config.get("ruleFile")).unwrap_or_default();
        let rules = match crate::rules::load_rules(&rule_source) {
            Ok(rules) => rules,
            Err(e) => {
                logger.error(&format!("failed to load rule file: {}", e));
                Vec::new()
            }
        };
        logger.line(&format!("loaded {} rules", rules.len()));

        let plugins = load_plugins(config.get("pluginDirectory"), &logger);
        let shader_compiler = new_shader_compiler(&logger);

        let instance = Arc::new(Instance {
            handle,
            ash_instance,
            next_get_instance_proc_addr,
            config,
            logger,
            rules,
            globals: Mutex::new(GlobalRuleContext::default()),
            override_cache,
            fd_registry: Mutex::new(HashMap::new()),
            plugins: Mutex::new(plugins),
            shader_compile_cache: Mutex::new(CompileCache::default()),
            shader_compiler,
        });

        instance.fire_init();
        Ok(instance)
    }

    fn fire_init(self: &Arc<Self>) {
        let mut globals = self.globals.lock().expect("rule globals lock poisoned");
        let mut ctx = Context {
            logger: &self.logger,
            instance: self.clone(),
            device: None,
            command_buffer_handle: None,
            command_buffer: None,
            globals: &mut globals,
            additional_info: AdditionalInfo::None,
            primary_handle: 0,
            locals: HashMap::new(),
            reduction_stack: Vec::new(),
            canceled: false,
            overrides: Vec::new(),
            creation_callbacks: Vec::new(),
            custom_tag: None,
        };
        execute_rules(&self.rules, SelectorType::Init, 0, &mut ctx);
    }

    /// Fires a `receive` rule for one framed inbound message (component I's
    /// socket reader threads call this directly).
    pub fn fire_receive(self: &Arc<Self>, bytes: Vec<u8>) {
        let mut globals = self.globals.lock().expect("rule globals lock poisoned");
        let mut ctx = Context {
            logger: &self.logger,
            instance: self.clone(),
            device: None,
            command_buffer_handle: None,
            command_buffer: None,
            globals: &mut globals,
            additional_info: AdditionalInfo::Receive { bytes },
            primary_handle: 0,
            locals: HashMap::new(),
            reduction_stack: Vec::new(),
            canceled: false,
            overrides: Vec::new(),
            creation_callbacks: Vec::new(),
            custom_tag: None,
        };
        execute_rules(&self.rules, SelectorType::Receive, 0, &mut ctx);
    }
}

#[cfg(feature = "shaderc")]
fn new_shader_compiler(logger: &InstanceLogger) -> Box<dyn ShaderCompiler> {
    match crate::assets::shader_compile::ShadercCompiler::new() {
        Ok(compiler) => Box::new(compiler),
        Err(e) => {
            logger.error(&format!("failed to initialize shaderc, GLSL shader overrides disabled: {}", e));
            Box::new(UnsupportedCompiler)
        }
    }
}

#[cfg(not(feature = "shaderc"))]
fn new_shader_compiler(_logger: &InstanceLogger) -> Box<dyn ShaderCompiler> {
    Box::new(UnsupportedCompiler)
}

fn load_plugins(dir: &str, logger: &InstanceLogger) -> Vec<libloading::Library> {
    let mut loaded = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        logger.line(&format!("no plugin directory at \"{}\"", dir));
        return loaded;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        // SAFETY: plugin shared objects are trusted operator-provided
        // extensions, loaded once at instance bootstrap; their
        // constructors (if any) run here.
        match unsafe { libloading::Library::new(&path) } {
            Ok(lib) => {
                logger.line(&format!("loaded plugin from {}", path.display()));
                loaded.push(lib);
            }
            Err(e) => logger.error(&format!("failed to load plugin {}: {}", path.display(), e)),
        }
    }
    loaded
}

impl Drop for Instance {
    fn drop(&mut self) {
        for fd in self.fd_registry.lock().expect("fd registry lock poisoned").values() {
            fd.close();
        }
    }
}

pub fn app_and_engine_name(create_info: &vk::InstanceCreateInfo) -> (String, String) {
    let app_info = unsafe { create_info.p_application_info.as_ref() };
    let app_name = app_info
        .and_then(|i| if i.p_application_name.is_null() { None } else { Some(unsafe { CStr::from_ptr(i.p_application_name) }) })
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_owned());
    let engine_name = app_info
        .and_then(|i| if i.p_engine_name.is_null() { None } else { Some(unsafe { CStr::from_ptr(i.p_engine_name) }) })
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_owned());
    (app_name, engine_name)
}
