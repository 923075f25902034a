use std::fmt;
use std::ptr;
use std::sync::Arc;

use native_wgpu_sys as sys;

use crate::device::Device;
use crate::error::GpuError;
use crate::handle::{Guarded, HandleState};
use crate::marshal::Arena;
use crate::types::{PipelineStatisticName, QueryType};

/// Describes a [`QuerySet`].
#[derive(Debug, Clone, Copy)]
pub struct QuerySetDescriptor<'a> {
    pub label: Option<&'a str>,
    pub ty: QueryType,
    pub count: u32,
    /// Only read for [`QueryType::PIPELINE_STATISTICS`].
    pub pipeline_statistics: &'a [PipelineStatisticName],
}

struct QuerySetShared {
    handle: Guarded<sys::QuerySetImpl>,
    label: Option<String>,
    ty: QueryType,
    count: u32,
}

/// A fixed number of GPU query slots of one type.
#[derive(Clone)]
pub struct QuerySet {
    shared: Arc<QuerySetShared>,
}

impl QuerySet {
    pub(crate) fn create(device: &Device, descriptor: &QuerySetDescriptor) -> Result<Self, GpuError> {
        let raw_device = device.live()?;
        let mut arena = Arena::new();
        let (pipeline_statistics, statistics_count) = arena.slice(descriptor.pipeline_statistics);
        let native = sys::QuerySetDescriptor {
            next_in_chain: ptr::null(),
            label: arena.label(descriptor.label)?,
            type_: descriptor.ty,
            count: descriptor.count,
            pipeline_statistics,
            pipeline_statistics_count: statistics_count as u32,
        };
        let raw = unsafe { device.api().device_create_query_set(raw_device, &native) };
        tracing::debug!(ty = ?descriptor.ty, count = descriptor.count, "Query set created");

        Ok(Self {
            shared: Arc::new(QuerySetShared {
                handle: Guarded::new(device.api().clone(), raw)?,
                label: descriptor.label.map(str::to_owned),
                ty: descriptor.ty,
                count: descriptor.count,
            }),
        })
    }

    pub(crate) fn live(&self) -> Result<sys::QuerySet, GpuError> {
        self.shared.handle.live()
    }

    pub fn label(&self) -> Result<Option<&str>, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.label.as_deref())
    }

    pub fn query_type(&self) -> Result<QueryType, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.ty)
    }

    pub fn count(&self) -> Result<u32, GpuError> {
        self.shared.handle.raw()?;
        Ok(self.shared.count)
    }

    pub fn state(&self) -> HandleState {
        self.shared.handle.state()
    }

    pub fn destroy(&self) -> Result<bool, GpuError> {
        self.shared.handle.destroy()
    }

    pub fn release(&self) -> bool {
        self.shared.handle.release()
    }
}

impl PartialEq for QuerySet {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for QuerySet {}

impl fmt::Debug for QuerySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySet")
            .field("label", &self.shared.label)
            .field("ty", &self.shared.ty)
            .field("count", &self.shared.count)
            .field("handle", &self.shared.handle)
            .finish()
    }
}
