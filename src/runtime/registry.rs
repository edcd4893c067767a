//! Process-wide mapping from places to runtimes

use super::{CpuRuntime, Runtime};
use crate::error::{Error, Result};
use crate::place::Place;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

static REGISTRY: OnceLock<RwLock<HashMap<Place, Arc<dyn Runtime>>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<Place, Arc<dyn Runtime>>> {
    REGISTRY.get_or_init(|| {
        let mut runtimes: HashMap<Place, Arc<dyn Runtime>> = HashMap::new();
        runtimes.insert(Place::Host, Arc::new(CpuRuntime::new()));
        RwLock::new(runtimes)
    })
}

/// Look up the runtime that allocates on `place`
///
/// The host place is always available. Device places fail with
/// `PlaceUnsupported` until a runtime is registered for them.
pub fn runtime_for(place: Place) -> Result<Arc<dyn Runtime>> {
    registry()
        .read()
        .get(&place)
        .cloned()
        .ok_or_else(|| Error::place_unsupported(place))
}

/// Returns true if a runtime is registered for `place`
pub fn is_supported(place: Place) -> bool {
    registry().read().contains_key(&place)
}

/// Register `runtime` for the place it reports, replacing any previous one
///
/// Blocks allocated by a replaced runtime stay valid: each block holds its
/// own reference to the runtime that allocated it.
pub fn register(runtime: Arc<dyn Runtime>) -> Option<Arc<dyn Runtime>> {
    let place = runtime.place();
    log::debug!("registering {} runtime for {}", runtime.name(), place);
    registry().write().insert(place, runtime)
}

/// Register `runtime` unless its place already has one; returns the runtime in effect
pub fn register_if_absent(runtime: Arc<dyn Runtime>) -> Arc<dyn Runtime> {
    let place = runtime.place();
    registry()
        .write()
        .entry(place)
        .or_insert_with(|| {
            log::debug!("registering {} runtime for {}", runtime.name(), place);
            runtime
        })
        .clone()
}

/// Remove the runtime for a device place
///
/// The host runtime cannot be removed; `None` is returned for `Place::Host`.
pub fn unregister(place: Place) -> Option<Arc<dyn Runtime>> {
    if place.is_host() {
        return None;
    }
    registry().write().remove(&place)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{EmulatedConfig, EmulatedRuntime};

    #[test]
    fn test_host_always_registered() {
        assert!(is_supported(Place::Host));
        let runtime = runtime_for(Place::Host).unwrap();
        assert_eq!(runtime.name(), "cpu");
        assert!(unregister(Place::Host).is_none());
        assert!(is_supported(Place::Host));
    }

    #[test]
    fn test_unregistered_device() {
        let place = Place::Device(9001);
        assert!(!is_supported(place));
        assert_eq!(
            runtime_for(place).unwrap_err(),
            Error::PlaceUnsupported { place }
        );
    }

    #[test]
    fn test_register_and_unregister() {
        let place = Place::Device(9002);
        let runtime = Arc::new(EmulatedRuntime::new(9002, EmulatedConfig::default()));
        assert!(register(runtime).is_none());
        assert!(is_supported(place));
        assert_eq!(runtime_for(place).unwrap().place(), place);

        assert!(unregister(place).is_some());
        assert!(!is_supported(place));
    }

    #[test]
    fn test_register_if_absent_keeps_first() {
        let first: Arc<dyn Runtime> = Arc::new(EmulatedRuntime::new(
            9003,
            EmulatedConfig::with_capacity(10),
        ));
        let second: Arc<dyn Runtime> =
            Arc::new(EmulatedRuntime::new(9003, EmulatedConfig::default()));

        let active = register_if_absent(first.clone());
        assert!(Arc::ptr_eq(&active, &first));
        let active = register_if_absent(second);
        assert!(Arc::ptr_eq(&active, &first));

        unregister(Place::Device(9003));
    }
}
