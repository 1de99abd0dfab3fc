//! Process-wide dispatch-key registries (component: loader plumbing). Every
//! hooked entry point looks its owning [`crate::instance::Instance`] or
//! [`crate::device::Device`] up here before doing anything else.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::device::Device;
use crate::dispatch::DispatchKey;
use crate::instance::Instance;

static INSTANCES: Lazy<RwLock<HashMap<DispatchKey, Arc<Instance>>>> = Lazy::new(|| RwLock::new(HashMap::new()));
static DEVICES: Lazy<RwLock<HashMap<DispatchKey, Arc<Device>>>> = Lazy::new(|| RwLock::new(HashMap::new()));

pub fn register_instance(key: DispatchKey, instance: Arc<Instance>) {
    INSTANCES.write().expect("instance registry poisoned").insert(key, instance);
}

pub fn lookup_instance(key: DispatchKey) -> Option<Arc<Instance>> {
    INSTANCES.read().expect("instance registry poisoned").get(&key).cloned()
}

pub fn unregister_instance(key: DispatchKey) -> Option<Arc<Instance>> {
    INSTANCES.write().expect("instance registry poisoned").remove(&key)
}

pub fn register_device(key: DispatchKey, device: Arc<Device>) {
    DEVICES.write().expect("device registry poisoned").insert(key, device);
}

pub fn lookup_device(key: DispatchKey) -> Option<Arc<Device>> {
    DEVICES.read().expect("device registry poisoned").get(&key).cloned()
}

pub fn unregister_device(key: DispatchKey) -> Option<Arc<Device>> {
    DEVICES.write().expect("device registry poisoned").remove(&key)
}
