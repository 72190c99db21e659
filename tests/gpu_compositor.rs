//! GPU tests for the offscreen target, compositor and pass ordering.
//!
//! Each test asks for a headless adapter first and returns early when the
//! machine has none, so the suite still passes on CI runners without a GPU.

use driftscene::config::CompositorSettings;
use driftscene::gpu::render_target::{OffscreenTarget, TargetOptions};
use driftscene::gpu::renderer::{CameraFrame, PassKind, Renderer};
use driftscene::gpu::GpuContext;
use driftscene::scene::{MeshLayer, PointLight, Scene};
use driftscene::viewport::ResizeSink;
use driftscene::{
    GeometryKind, InstanceTransform, RenderError, RenderTargetError, Vec3, ViewportController,
    ViewportSize,
};
use glam::Mat4;

fn gpu() -> Option<GpuContext> {
    match pollster::block_on(GpuContext::headless()) {
        Ok(gpu) => Some(gpu),
        Err(err) => {
            eprintln!("skipping GPU test: {err}");
            None
        }
    }
}

fn camera() -> CameraFrame {
    CameraFrame {
        view_proj: Mat4::perspective_rh(50f32.to_radians(), 1.0, 0.1, 100.0)
            * Mat4::look_at_rh(Vec3::new(0.0, 0.0, 30.0), Vec3::ZERO, Vec3::Y),
        eye: Vec3::new(0.0, 0.0, 30.0),
    }
}

fn plain_compositor() -> CompositorSettings {
    CompositorSettings {
        time_scale: 0.5,
        vignette: 0.0,
        grain: 0.0,
    }
}

#[test]
fn test_black_source_composites_to_black() {
    let Some(gpu) = gpu() else { return };
    let mut renderer = Renderer::headless(
        gpu,
        ViewportSize::clamped(64, 48),
        &CompositorSettings::default(),
    )
    .unwrap();
    renderer.set_time(0.0);

    let scene = Scene::new([0.0, 0.0, 0.0, 1.0], PointLight::default());
    renderer.draw(&scene, camera(), None).unwrap();

    let image = renderer.read_frame().unwrap();
    assert_eq!(image.dimensions(), (64, 48));
    for pixel in image.pixels() {
        assert_eq!(&pixel.0[..3], &[0, 0, 0]);
    }
}

#[test]
fn test_previous_frame_does_not_bleed_through() {
    let Some(gpu) = gpu() else { return };
    let mut renderer = Renderer::headless(
        gpu,
        ViewportSize::clamped(64, 48),
        &CompositorSettings::default(),
    )
    .unwrap();

    let red = Scene::new([1.0, 0.0, 0.0, 1.0], PointLight::default());
    renderer.set_time(3.0);
    renderer.draw(&red, camera(), None).unwrap();
    assert_ne!(&renderer.read_frame().unwrap().get_pixel(32, 24).0[..3], &[0, 0, 0]);

    let black = Scene::new([0.0, 0.0, 0.0, 1.0], PointLight::default());
    renderer.set_time(0.0);
    renderer.draw(&black, camera(), None).unwrap();

    let image = renderer.read_frame().unwrap();
    for pixel in image.pixels() {
        assert_eq!(&pixel.0[..3], &[0, 0, 0]);
    }
}

#[test]
fn test_compositor_samples_offscreen_color() {
    let Some(gpu) = gpu() else { return };
    let mut renderer =
        Renderer::headless(gpu, ViewportSize::clamped(32, 32), &plain_compositor()).unwrap();

    let scene = Scene::new([1.0, 0.0, 0.0, 1.0], PointLight::default());
    renderer.draw(&scene, camera(), None).unwrap();

    let image = renderer.read_frame().unwrap();
    assert_eq!(image.get_pixel(16, 16).0, [255, 0, 0, 255]);
}

#[test]
fn test_pass_order() {
    let Some(gpu) = gpu() else { return };
    let mut renderer =
        Renderer::headless(gpu, ViewportSize::clamped(32, 32), &plain_compositor()).unwrap();

    let background = Scene::new([0.0; 4], PointLight::default());
    renderer.draw(&background, camera(), None).unwrap();
    assert_eq!(
        renderer.last_trace(),
        &[PassKind::Offscreen, PassKind::Composite, PassKind::Readback]
    );

    let mut overlay = Scene::new([0.0; 4], PointLight::default());
    overlay.add_layer(MeshLayer::single(
        "overlay",
        GeometryKind::Tetrahedron {
            radius: 10.0,
            detail: 0,
        },
        [1.0, 1.0, 1.0],
        InstanceTransform::default(),
    ));
    renderer
        .draw(&background, camera(), Some((&overlay, camera())))
        .unwrap();
    assert_eq!(
        renderer.last_trace(),
        &[
            PassKind::Offscreen,
            PassKind::Composite,
            PassKind::Overlay,
            PassKind::Readback
        ]
    );
    assert_eq!(renderer.frames_drawn(), 2);

    // The overlay is drawn over the black composite.
    let image = renderer.read_frame().unwrap();
    assert_ne!(&image.get_pixel(16, 16).0[..3], &[0, 0, 0]);
}

#[test]
fn test_resize_is_idempotent() {
    let Some(gpu) = gpu() else { return };
    let mut renderer =
        Renderer::headless(gpu, ViewportSize::clamped(64, 64), &plain_compositor()).unwrap();

    renderer.apply_viewport(ViewportSize::clamped(100, 80)).unwrap();
    let size = renderer.target().size();
    let footprint = renderer.target().footprint_bytes();
    let generation = renderer.target().generation();

    renderer.apply_viewport(ViewportSize::clamped(100, 80)).unwrap();
    assert_eq!(renderer.target().size(), size);
    assert_eq!(renderer.target().footprint_bytes(), footprint);
    assert_eq!(renderer.target().generation(), generation);
    assert_eq!(size, (100, 80));
    assert_eq!(renderer.compositor().uniforms().resolution, [100.0, 80.0]);
}

#[test]
fn test_oversized_resize_leaves_renderer_untouched() {
    let Some(gpu) = gpu() else { return };
    let too_big = gpu.max_texture_extent() + 1;
    let mut renderer =
        Renderer::headless(gpu, ViewportSize::clamped(64, 64), &plain_compositor()).unwrap();
    let generation = renderer.target().generation();

    let err = renderer
        .apply_viewport(ViewportSize::clamped(too_big, 64))
        .unwrap_err();
    assert!(matches!(
        err,
        RenderError::Target(RenderTargetError::TooLarge { .. })
    ));
    assert_eq!(renderer.target().size(), (64, 64));
    assert_eq!(renderer.target().generation(), generation);
    assert_eq!(renderer.compositor().uniforms().resolution, [64.0, 64.0]);

    let scene = Scene::new([0.0; 4], PointLight::default());
    renderer.draw(&scene, camera(), None).unwrap();
    assert_eq!(renderer.read_frame().unwrap().dimensions(), (64, 64));
}

#[test]
fn test_minimize_then_restore_renders() {
    let Some(gpu) = gpu() else { return };
    let mut renderer =
        Renderer::headless(gpu, ViewportSize::clamped(800, 600), &plain_compositor()).unwrap();
    let mut viewport = ViewportController::new(800, 600);
    let scene = Scene::new([0.0; 4], PointLight::default());

    viewport.on_resize(0, 0, &mut renderer).unwrap();
    assert_eq!(renderer.target().size(), (1, 1));
    renderer.draw(&scene, camera(), None).unwrap();
    assert_eq!(renderer.read_frame().unwrap().dimensions(), (1, 1));

    viewport.on_resize(800, 600, &mut renderer).unwrap();
    assert_eq!(renderer.target().size(), (800, 600));
    renderer.draw(&scene, camera(), None).unwrap();
    assert_eq!(renderer.read_frame().unwrap().dimensions(), (800, 600));
}

#[test]
fn test_target_rejects_bad_extents() {
    let Some(gpu) = gpu() else { return };
    let device = &gpu.device;

    assert!(matches!(
        OffscreenTarget::create(device, 0, 10, TargetOptions::default()),
        Err(RenderTargetError::ZeroExtent { .. })
    ));

    let too_big = gpu.max_texture_extent() + 1;
    assert!(matches!(
        OffscreenTarget::create(device, too_big, 4, TargetOptions::default()),
        Err(RenderTargetError::TooLarge { .. })
    ));

    let mut target = OffscreenTarget::create(device, 8, 8, TargetOptions::default()).unwrap();
    assert!(target.resize(device, 0, 8).is_err());
    assert_eq!(target.size(), (8, 8));
    assert!(!target.resize(device, 8, 8).unwrap());
    assert!(target.resize(device, 16, 8).unwrap());
    assert_eq!(target.footprint_bytes(), 16 * 8 * 8);
}
