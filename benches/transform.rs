use criterion::{criterion_group, criterion_main, Criterion};
use hdmi_mirror::blit::{BlitDescriptor, BlitSink};
use hdmi_mirror::display::{compute_blit_with_rotation, PhysicalSize, PixelFormat, Rect};
use hdmi_mirror::session::{HdmiOutput, MirrorReason};
use hdmi_mirror::{DisplayMode, ManualOrientation, Mirror, MirrorSettings, Rotation, ScalingMode, ScreenGeometry};
use std::sync::Arc;

struct NullSink;

impl BlitSink for NullSink {
    fn fill_rect(&self, _target: &ScreenGeometry, _rect: Rect, _color: u32) {}
    fn blit_on_vsync(&self, _request: &BlitDescriptor) {}
}

impl HdmiOutput for NullSink {
    fn best_resolution(&self) -> Option<(u32, u32)> {
        Some((1280, 720))
    }
    fn set_mode(&self, _mode: &DisplayMode) -> hdmi_mirror::Result<()> {
        Ok(())
    }
    fn start_mirroring(&self, _reason: MirrorReason) {}
    fn stop_mirroring(&self, _reason: MirrorReason) {}
    fn is_cable_connected(&self) -> bool {
        true
    }
}

fn source() -> ScreenGeometry {
    let mut geometry = ScreenGeometry::new(480, 800, PixelFormat::Rgbx8888, PhysicalSize::mm(56, 94));
    geometry.yres_virtual = 1600;
    geometry
}

fn hdmi() -> ScreenGeometry {
    ScreenGeometry::new(1280, 720, PixelFormat::Rgb565, PhysicalSize::cm(16, 9))
}

fn bench_compute_blit(c: &mut Criterion) {
    let src = source();
    let dst = hdmi();
    let settings = MirrorSettings {
        scaling: ScalingMode::FitToScreen,
        ..MirrorSettings::default()
    };

    c.bench_function("compute_blit_fit_90", |b| {
        b.iter(|| compute_blit_with_rotation(&src, &dst, &settings, Rotation::Deg90).expect("compute blit"))
    });
}

fn bench_report_frame(c: &mut Criterion) {
    let sink = Arc::new(NullSink);
    let mirror = Mirror::new(
        MirrorSettings::default(),
        Arc::new(ManualOrientation::new(Rotation::Deg0)),
        sink.clone(),
        sink,
    );
    let mut src = source();
    let dst = hdmi();
    let mut frame = 0u32;

    c.bench_function("report_frame_steady", |b| {
        b.iter(|| {
            frame += 1;
            src.yoffset = if frame % 2 == 0 { 0 } else { 800 };
            mirror.report_frame(&src, &dst).expect("report frame")
        })
    });
}

criterion_group!(benches, bench_compute_blit, bench_report_frame);
criterion_main!(benches);
