use std::path::PathBuf;

use anyhow::Context;
use tessera_engine::core::{App, AppControl, FrameCtx, LoadCtx};
use tessera_engine::input::Key;
use tessera_engine::render::{Model, ModelLayouts, Shader};

use crate::camera::OrbitCamera;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.02,
    b: 0.07,
    a: 1.0,
};

/// GPU state that only exists between `load` and `unload`.
struct Loaded {
    layouts: ModelLayouts,
    shader: Shader,
    model: Model,
}

/// Renders one glTF scene with an orbiting camera.
pub struct ViewerApp {
    scene: PathBuf,
    shader: Option<PathBuf>,
    camera: OrbitCamera,
    loaded: Option<Loaded>,
}

impl ViewerApp {
    pub fn new(scene: PathBuf, shader: Option<PathBuf>) -> Self {
        Self {
            scene,
            shader,
            camera: OrbitCamera::default(),
            loaded: None,
        }
    }
}

impl App for ViewerApp {
    fn load(&mut self, ctx: &mut LoadCtx<'_, '_>) -> anyhow::Result<()> {
        let rctx = ctx.render_ctx();
        let layouts = ModelLayouts::new(rctx.device);

        let shader = match &self.shader {
            Some(path) => Shader::from_file(&rctx, path, &layouts),
            None => Shader::default_model(&rctx, &layouts),
        }
        .context("failed to build model shader")?;

        let model = Model::load(&rctx, &layouts, &self.scene)?;

        self.loaded = Some(Loaded {
            layouts,
            shader,
            model,
        });
        Ok(())
    }

    fn update(&mut self, ctx: &mut FrameCtx<'_, '_>) {
        if ctx.was_key_pressed(Key::Escape) {
            ctx.request_close();
        }
        if ctx.was_key_pressed(Key::Space) {
            self.camera.paused = !self.camera.paused;
            log::info!("orbit {}", if self.camera.paused { "paused" } else { "resumed" });
        }

        self.camera.zoom(ctx.input_frame.wheel_lines);
        self.camera.advance(ctx.dt());
    }

    fn render(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(loaded) = self.loaded.as_mut() else {
            return AppControl::Continue;
        };

        let aspect = ctx.gpu.aspect_ratio();
        let queue = ctx.gpu.queue();
        loaded
            .shader
            .set_matrix(queue, Shader::PROJECTION, &self.camera.projection(aspect));
        loaded
            .shader
            .set_matrix(queue, Shader::VIEW, &self.camera.view());

        let Loaded {
            layouts,
            shader,
            model,
        } = loaded;
        ctx.render(CLEAR_COLOR, |rctx, target| {
            model.draw(rctx, layouts, target, shader);
        })
    }

    fn unload(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            log::debug!(
                "releasing {} meshes and {} textures",
                loaded.model.meshes().len(),
                loaded.model.texture_count()
            );
        }
    }
}
