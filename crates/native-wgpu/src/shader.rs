use std::ptr;

use native_wgpu_sys as sys;

use crate::callback;
use crate::chain::ChainBuilder;
use crate::device::Device;
use crate::error::{GpuError, ResourceKind};
use crate::marshal::{Arena, message_to_string};
use crate::resource::labeled_resource;
use crate::types::CompilationMessageType;

/// Shader code in one of the formats the native side accepts.
#[derive(Debug, Clone, Copy)]
pub enum ShaderSource<'a> {
    Wgsl(&'a str),
    SpirV(&'a [u32]),
}

#[derive(Debug, Clone, Copy)]
pub struct ShaderModuleDescriptor<'a> {
    pub label: Option<&'a str>,
    pub source: ShaderSource<'a>,
}

labeled_resource! {
    /// A compiled shader module.
    ShaderModule => sys::ShaderModuleImpl
}

impl ShaderModule {
    pub(crate) fn create(device: &Device, descriptor: &ShaderModuleDescriptor) -> Result<Self, GpuError> {
        let raw_device = device.live()?;
        let mut chain = ChainBuilder::new();
        match descriptor.source {
            ShaderSource::Wgsl(code) => {
                chain.add_wgsl(code)?;
            }
            ShaderSource::SpirV(words) => {
                chain.add_spirv(words);
            }
        }

        let mut arena = Arena::new();
        let native = sys::ShaderModuleDescriptor {
            next_in_chain: arena.chain(chain),
            label: arena.label(descriptor.label)?,
            hint_count: 0,
            hints: ptr::null(),
        };
        let raw = unsafe { device.api().device_create_shader_module(raw_device, &native) };
        Self::from_raw(device.api().clone(), raw, descriptor.label)
    }
}

/// One diagnostic from shader compilation. Positions are in bytes of the
/// source text, lines are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationMessage {
    pub message: String,
    pub ty: CompilationMessageType,
    pub line_num: u64,
    pub line_pos: u64,
    pub offset: u64,
    pub length: u64,
}

impl CompilationMessage {
    /// # Safety
    ///
    /// `native.message` must be null or a valid C string.
    pub(crate) unsafe fn from_native(native: &sys::CompilationMessage) -> Self {
        Self {
            message: unsafe { message_to_string(native.message) },
            ty: native.type_,
            line_num: native.line_num,
            line_pos: native.line_pos,
            offset: native.offset,
            length: native.length,
        }
    }
}

impl ShaderModule {
    /// Ask for the compiler diagnostics of this module. `callback` may run
    /// before this returns or during a later event poll.
    pub fn compilation_info<F>(&self, callback: F) -> Result<(), GpuError>
    where
        F: FnOnce(Result<Vec<CompilationMessage>, GpuError>) + Send + 'static,
    {
        let module = self.raw()?;
        let (trampoline, userdata) = callback::compilation_info(move |status, messages| {
            let result = if status == sys::CompilationInfoRequestStatus::SUCCESS {
                Ok(messages)
            } else {
                tracing::warn!(?status, "Compilation info request failed");
                Err(GpuError::RequestFailed {
                    kind: ResourceKind::ShaderModule,
                    status: format!("{:?}", status),
                    message: String::new(),
                })
            };
            callback(result);
        });
        unsafe {
            self.inner
                .handle
                .api()
                .shader_module_get_compilation_info(module, trampoline, userdata)
        };
        Ok(())
    }
}

/// Reinterpret a SPIR-V binary as little-endian words.
pub fn spirv_words(bytes: &[u8]) -> Result<Vec<u32>, GpuError> {
    if bytes.len() % 4 != 0 {
        return Err(GpuError::InvalidArgument(format!(
            "SPIR-V length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
        .collect())
}
