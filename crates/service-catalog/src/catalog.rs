//! Named pools of service handles.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::error::CatalogError;
use crate::service::Service;

/// A pool of handles for one service.
///
/// Services are immutable after compilation, so pooling is an allocation
/// reuse: a handle is popped on checkout and pushed back when dropped, and
/// an empty pool clones the template.
#[derive(Debug)]
struct ServicePool {
    template: Service,
    idle: Mutex<Vec<Service>>,
}

/// Registry mapping command names to their service pools.
#[derive(Debug, Default)]
pub struct Catalog {
    pools: HashMap<String, Arc<ServicePool>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under its command name, replacing any previous
    /// registration.
    pub fn add(&mut self, service: Service) {
        let name = service.name().to_string();
        info!(service = %name, "registered service");
        let pool = ServicePool {
            idle: Mutex::new(vec![service.clone()]),
            template: service,
        };
        self.pools.insert(name, Arc::new(pool));
    }

    /// Check a service handle out of the named pool.
    ///
    /// The handle returns to the pool when dropped.
    pub fn checkout(&self, name: &str) -> Result<ServiceHandle, CatalogError> {
        let pool = self
            .pools
            .get(name)
            .ok_or_else(|| CatalogError::UnknownService(name.to_string()))?;

        let service = {
            let mut idle = pool.idle.lock().map_err(|_| CatalogError::Internal)?;
            idle.pop().unwrap_or_else(|| pool.template.clone())
        };

        Ok(ServiceHandle {
            service: Some(service),
            pool: Arc::clone(pool),
        })
    }

    /// Names of every registered service.
    pub fn services(&self) -> Vec<&str> {
        self.pools.keys().map(String::as_str).collect()
    }
}

/// A checked-out service, returned to its pool on drop.
#[derive(Debug)]
pub struct ServiceHandle {
    service: Option<Service>,
    pool: Arc<ServicePool>,
}

impl Deref for ServiceHandle {
    type Target = Service;

    fn deref(&self) -> &Service {
        self.service
            .as_ref()
            .expect("service present until handle drops")
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        if let Some(service) = self.service.take() {
            if let Ok(mut idle) = self.pool.idle.lock() {
                idle.push(service);
            }
        }
    }
}
