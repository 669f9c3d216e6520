use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;
use vulkanalia::prelude::v1_3::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Value of the `SHADER_STAGE` macro while compiling this stage.
    fn define(self) -> &'static str {
        match self {
            Self::Vertex => "1",
            Self::Fragment => "2",
        }
    }

    fn kind(self) -> shaderc::ShaderKind {
        match self {
            Self::Vertex => shaderc::ShaderKind::Vertex,
            Self::Fragment => shaderc::ShaderKind::Fragment,
        }
    }

    fn vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            Self::Vertex => vk::ShaderStageFlags::VERTEX,
            Self::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Fragment => write!(f, "fragment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Shader compiler unavailable.")]
    CompilerUnavailable,

    #[error("Failed to compile {stage} stage of `{name}`:\n{message}")]
    Compilation {
        name: String,
        stage: ShaderStage,
        message: String,
    },

    #[error("Failed to create pipeline `{name}`: {error}")]
    Vulkan { name: String, error: vk::ErrorCode },
}

#[derive(Clone, Debug, Default)]
pub struct ShaderCompileOptions {
    pub root_paths: Vec<PathBuf>,
    pub enable_debug_info: bool,
}

/// Resolves an `#include` against the including file's directory (relative
/// includes only), then against each root path in order.
fn resolve_include(
    root_paths: &[PathBuf],
    requested: &str,
    include_type: shaderc::IncludeType,
    requesting: &str,
) -> shaderc::IncludeCallbackResult {
    let relative_dir = match include_type {
        shaderc::IncludeType::Relative => Path::new(requesting).parent().map(Path::to_path_buf),
        shaderc::IncludeType::Standard => None,
    };

    for dir in relative_dir.iter().chain(root_paths) {
        let candidate = dir.join(requested);
        if let Ok(content) = std::fs::read_to_string(&candidate) {
            return Ok(shaderc::ResolvedInclude {
                resolved_name: candidate.to_string_lossy().into_owned(),
                content,
            });
        }
    }
    Err(format!("Cannot find include `{requested}` requested by `{requesting}`."))
}

pub struct ShaderCompiler {
    compiler: shaderc::Compiler,
    options: ShaderCompileOptions,
}

impl ShaderCompiler {
    pub fn new(options: ShaderCompileOptions) -> Result<Self, PipelineError> {
        let compiler = shaderc::Compiler::new().ok_or(PipelineError::CompilerUnavailable)?;
        Ok(Self { compiler, options })
    }

    /// Compiles one stage of `source` to SPIR-V words.
    pub fn compile(
        &mut self,
        source: &str,
        name: &str,
        stage: ShaderStage,
    ) -> Result<Vec<u32>, PipelineError> {
        let mut options =
            shaderc::CompileOptions::new().ok_or(PipelineError::CompilerUnavailable)?;
        options.set_source_language(shaderc::SourceLanguage::GLSL);
        options.set_target_env(shaderc::TargetEnv::Vulkan, shaderc::EnvVersion::Vulkan1_3 as u32);
        options.add_macro_definition("SHADER_STAGE_VERTEX", Some(ShaderStage::Vertex.define()));
        options.add_macro_definition("SHADER_STAGE_FRAGMENT", Some(ShaderStage::Fragment.define()));
        options.add_macro_definition("SHADER_STAGE", Some(stage.define()));
        if self.options.enable_debug_info {
            options.set_generate_debug_info();
        }
        let root_paths = self.options.root_paths.clone();
        options.set_include_callback(move |requested, include_type, requesting, _depth| {
            resolve_include(&root_paths, requested, include_type, requesting)
        });

        let artifact = self
            .compiler
            .compile_into_spirv(source, stage.kind(), name, "main", Some(&options))
            .map_err(|error| PipelineError::Compilation {
                name: name.to_string(),
                stage,
                message: error.to_string(),
            })?;

        if artifact.get_num_warnings() > 0 {
            tracing::warn!("{}", artifact.get_warning_messages());
        }
        Ok(artifact.as_binary().to_vec())
    }
}

pub struct RasterPipelineInfo<'a> {
    pub source: &'a str,
    pub color_format: vk::Format,
    pub push_constant_size: u32,
    pub name: &'a str,
}

#[derive(Debug)]
pub struct RasterPipeline {
    pub(super) handle: vk::Pipeline,
    pub(super) layout: vk::PipelineLayout,
    name: String,
}

impl RasterPipeline {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Removes the entries of `table` that nothing else holds a reference to.
fn take_unreferenced<T>(table: &mut Vec<Arc<T>>) -> Vec<Arc<T>> {
    let (released, kept) = table
        .drain(..)
        .partition(|entry| Arc::strong_count(entry) == 1);
    *table = kept;
    released
}

/// Compiles pipelines and keeps every pipeline it built until it is released
/// or the manager is destroyed.
pub struct PipelineManager {
    device: Rc<Device>,
    compiler: ShaderCompiler,
    pipelines: Vec<Arc<RasterPipeline>>,
    name: String,
}

impl PipelineManager {
    pub fn new(
        device: Rc<Device>,
        options: ShaderCompileOptions,
        name: &str,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            device,
            compiler: ShaderCompiler::new(options)?,
            pipelines: Vec::new(),
            name: name.to_string(),
        })
    }

    /// Compiles the vertex and fragment stages of `info.source` and builds a
    /// pipeline rendering into one color attachment of `info.color_format`.
    pub fn add_raster_pipeline(
        &mut self,
        info: RasterPipelineInfo<'_>,
    ) -> Result<Arc<RasterPipeline>, PipelineError> {
        let vertex = self.compiler.compile(info.source, info.name, ShaderStage::Vertex)?;
        let fragment = self.compiler.compile(info.source, info.name, ShaderStage::Fragment)?;

        let vulkan_error = |error| PipelineError::Vulkan {
            name: info.name.to_string(),
            error,
        };
        // SAFETY: every handle created here is destroyed before returning or
        // owned by the returned pipeline.
        let pipeline = unsafe {
            let vertex_module = self.create_shader_module(&vertex).map_err(vulkan_error)?;
            let fragment_module = match self.create_shader_module(&fragment) {
                Ok(module) => module,
                Err(error) => {
                    self.device.destroy_shader_module(vertex_module, None);
                    return Err(vulkan_error(error));
                }
            };
            let result = self.create_pipeline(&info, vertex_module, fragment_module);
            self.device.destroy_shader_module(vertex_module, None);
            self.device.destroy_shader_module(fragment_module, None);
            result.map_err(vulkan_error)?
        };

        tracing::info!("Pipeline manager `{}` built pipeline `{}`.", self.name, info.name);
        let pipeline = Arc::new(pipeline);
        self.pipelines.push(pipeline.clone());
        Ok(pipeline)
    }

    unsafe fn create_shader_module(&self, code: &[u32]) -> Result<vk::ShaderModule, vk::ErrorCode> {
        let info = vk::ShaderModuleCreateInfo::builder()
            .code_size(code.len() * std::mem::size_of::<u32>())
            .code(code);
        self.device.create_shader_module(&info, None)
    }

    unsafe fn create_pipeline(
        &self,
        info: &RasterPipelineInfo<'_>,
        vertex_module: vk::ShaderModule,
        fragment_module: vk::ShaderModule,
    ) -> Result<RasterPipeline, vk::ErrorCode> {
        let stages = [
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(ShaderStage::Vertex.vk_stage())
                .module(vertex_module)
                .name(b"main\0"),
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(ShaderStage::Fragment.vk_stage())
                .module(fragment_module)
                .name(b"main\0"),
        ];

        let push_constant_ranges = [vk::PushConstantRange::builder()
            .stage_flags(vk::ShaderStageFlags::ALL_GRAPHICS)
            .offset(0)
            .size(info.push_constant_size)];
        let layout_info =
            vk::PipelineLayoutCreateInfo::builder().push_constant_ranges(&push_constant_ranges);
        let layout = self.device.create_pipeline_layout(&layout_info, None)?;

        // Vertices are fetched through the buffer address, not vertex input.
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::builder();
        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        // Viewport and scissor are dynamic.
        let viewports = [vk::Viewport::default()];
        let scissors = [vk::Rect2D::default()];
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::_1);

        let attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::all())
            .blend_enable(false)];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .logic_op(vk::LogicOp::COPY)
            .attachments(&attachments)
            .blend_constants([0.0, 0.0, 0.0, 0.0]);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let color_attachment_formats = [info.color_format];
        let mut rendering_info = vk::PipelineRenderingCreateInfo::builder()
            .color_attachment_formats(&color_attachment_formats);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .push_next(&mut rendering_info);

        match self
            .device
            .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        {
            Ok((pipelines, _)) => Ok(RasterPipeline {
                handle: pipelines[0],
                layout,
                name: info.name.to_string(),
            }),
            Err(error) => {
                self.device.destroy_pipeline_layout(layout, None);
                Err(error)
            }
        }
    }

    /// Hands back the pipelines whose last outside reference was dropped. The
    /// caller destroys them once the device no longer uses them.
    pub fn take_released(&mut self) -> Vec<Arc<RasterPipeline>> {
        take_unreferenced(&mut self.pipelines)
    }

    /// Destroys every pipeline this manager still holds. The device must be idle.
    pub unsafe fn destroy(&mut self) {
        for pipeline in self.pipelines.drain(..) {
            if Arc::strong_count(&pipeline) > 1 {
                tracing::warn!(
                    "Pipeline `{}` is still referenced while its manager is destroyed.",
                    pipeline.name
                );
            }
            self.device.destroy_pipeline(pipeline.handle, None);
            self.device.destroy_pipeline_layout(pipeline.layout, None);
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
