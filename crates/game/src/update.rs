//! Per-frame update and render for GameState.

use renderer::RenderError;
use std::time::Duration;

const FPS_REPORT_INTERVAL: Duration = Duration::from_secs(1);

impl crate::GameState {
    /// Advance the simulation by one fixed step using the latest input.
    pub(crate) fn update(&mut self) {
        self.time.update();

        let snapshot = self.input.snapshot();
        let report = self.sim.tick(&snapshot);
        for hit in &report.hits {
            if hit.target == self.sim.target() {
                log::info!(
                    "Target hit by {:?} at tick {} (impulse {:.0})",
                    hit.projectile,
                    self.sim.ticks(),
                    hit.impulse.length()
                );
            }
        }
        if report.expired > 0 {
            log::debug!("{} projectile(s) out of range", report.expired);
        }

        let chase = &self.sim.chase_camera;
        self.camera.set_position_look_at(chase.position, chase.look_at);

        if let Some(fps) = self.time.take_report(FPS_REPORT_INTERVAL) {
            log::debug!(
                "{:.0} fps (frame {}), {} visuals, {} bodies",
                fps,
                self.time.frame_count(),
                self.sim.scene.len(),
                self.sim.physics.body_count()
            );
        }

        // One-shot input (fire) is consumed by this tick.
        self.input.begin_frame();
    }

    pub(crate) fn render(&mut self) -> Result<(), RenderError> {
        self.renderer.update_camera(&self.camera);
        self.renderer.render(&self.sim.scene)
    }
}
