//! Mirroring session driven by hotplug and display-ownership events.
//!
//! The session decides when mirroring runs. It never touches frame
//! geometry; that is the coordinator's job in [`crate::mirror`].

use crate::display::{select_resolution, DisplayMode};
use crate::error::Result;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Why the mirror loop is being started or stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorReason {
    /// HDMI cable plugged in
    Connect,
    /// HDMI cable removed
    Disconnect,
    /// Another client took over the HDMI path
    Preempt,
    /// The HDMI path was handed back to mirroring
    Resume,
}

impl MirrorReason {
    /// Numeric code understood by the output driver
    pub fn code(self) -> u32 {
        match self {
            MirrorReason::Connect | MirrorReason::Disconnect => 0,
            MirrorReason::Preempt | MirrorReason::Resume => 1,
        }
    }
}

impl fmt::Display for MirrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorReason::Connect => write!(f, "connect"),
            MirrorReason::Disconnect => write!(f, "disconnect"),
            MirrorReason::Preempt => write!(f, "preempt"),
            MirrorReason::Resume => write!(f, "resume"),
        }
    }
}

/// HDMI output driver as seen by the session
pub trait HdmiOutput: Send + Sync {
    /// Best mode advertised by the sink's EDID
    fn best_resolution(&self) -> Option<(u32, u32)>;

    /// Program the HDMI framebuffer
    fn set_mode(&self, mode: &DisplayMode) -> Result<()>;

    fn start_mirroring(&self, reason: MirrorReason);

    fn stop_mirroring(&self, reason: MirrorReason);

    fn is_cable_connected(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorPhase {
    #[default]
    Disconnected,
    Mirroring,
    /// Cable connected but the HDMI path belongs to someone else
    Disabled,
}

pub struct MirrorSession {
    output: Arc<dyn HdmiOutput>,
    phase: Mutex<MirrorPhase>,
    mirroring: AtomicBool,
}

impl MirrorSession {
    pub fn new(output: Arc<dyn HdmiOutput>) -> Self {
        Self {
            output,
            phase: Mutex::new(MirrorPhase::Disconnected),
            mirroring: AtomicBool::new(false),
        }
    }

    /// Set on cable connect, cleared on disconnect
    pub fn is_mirroring(&self) -> bool {
        self.mirroring.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> MirrorPhase {
        *self.phase.lock()
    }

    /// Cable plugged in: pick a mode and start mirroring.
    ///
    /// Mirroring starts even if no mode could be applied; the error is
    /// returned so the caller can report it.
    pub fn on_cable_connect(&self) -> Result<DisplayMode> {
        info!("HDMI cable connected");
        let mut phase = self.phase.lock();

        self.mirroring.store(true, Ordering::Release);
        let mode = self.apply_resolution();
        self.output.start_mirroring(MirrorReason::Connect);
        *phase = MirrorPhase::Mirroring;

        mode
    }

    pub fn on_cable_disconnect(&self) {
        info!("HDMI cable disconnected");
        let mut phase = self.phase.lock();

        self.output.stop_mirroring(MirrorReason::Disconnect);
        self.mirroring.store(false, Ordering::Release);
        *phase = MirrorPhase::Disconnected;
    }

    /// Another client wants the HDMI path. Always succeeds.
    pub fn on_external_enable_request(&self) -> bool {
        info!("HDMI requested by another client, pausing mirroring");
        let mut phase = self.phase.lock();

        self.output.stop_mirroring(MirrorReason::Preempt);
        if *phase == MirrorPhase::Mirroring {
            *phase = MirrorPhase::Disabled;
        }
        true
    }

    /// The HDMI path was released; resume mirroring if it should run.
    ///
    /// Returns `Ok(None)` when nothing was resumed. The mode is applied
    /// both before and after restarting because starting the loop may
    /// reset the framebuffer. Mirroring resumes even if an application
    /// fails; the first failure is returned.
    pub fn on_external_disable_request(&self) -> Result<Option<DisplayMode>> {
        let mut phase = self.phase.lock();

        if !self.is_mirroring() {
            debug!("HDMI released but mirroring is not active");
            return Ok(None);
        }
        if !self.output.is_cable_connected() {
            debug!("HDMI released but cable is not connected");
            return Ok(None);
        }

        info!("HDMI released, resuming mirroring");
        let before = self.apply_resolution();
        self.output.start_mirroring(MirrorReason::Resume);
        let after = self.apply_resolution();
        *phase = MirrorPhase::Mirroring;

        before.and(after).map(Some)
    }

    fn apply_resolution(&self) -> Result<DisplayMode> {
        select_resolution(self.output.as_ref()).map_err(|e| {
            warn!("Failed to select HDMI resolution: {}", e);
            e
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::MirrorError;
    use std::sync::atomic::AtomicU32;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        BestResolution,
        SetMode(u32, u32),
        Start(MirrorReason),
        Stop(MirrorReason),
    }

    /// Output that records every driver call
    pub(crate) struct RecordingOutput {
        pub resolution: Option<(u32, u32)>,
        pub connected: AtomicBool,
        /// Upcoming EDID reads that find no mode
        pub missing_reads: AtomicU32,
        pub reject_modes: AtomicBool,
        pub calls: Mutex<Vec<Call>>,
    }

    impl RecordingOutput {
        pub(crate) fn new(resolution: Option<(u32, u32)>) -> Self {
            Self {
                resolution,
                connected: AtomicBool::new(true),
                missing_reads: AtomicU32::new(0),
                reject_modes: AtomicBool::new(false),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn take_calls(&self) -> Vec<Call> {
            std::mem::take(&mut *self.calls.lock())
        }
    }

    impl HdmiOutput for RecordingOutput {
        fn best_resolution(&self) -> Option<(u32, u32)> {
            self.calls.lock().push(Call::BestResolution);
            let missing = self
                .missing_reads
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
                .is_ok();
            if missing {
                None
            } else {
                self.resolution
            }
        }

        fn set_mode(&self, mode: &DisplayMode) -> Result<()> {
            self.calls.lock().push(Call::SetMode(mode.width, mode.height));
            if self.reject_modes.load(Ordering::Relaxed) {
                return Err(MirrorError::ModeSet(format!("{} rejected", mode)));
            }
            Ok(())
        }

        fn start_mirroring(&self, reason: MirrorReason) {
            self.calls.lock().push(Call::Start(reason));
        }

        fn stop_mirroring(&self, reason: MirrorReason) {
            self.calls.lock().push(Call::Stop(reason));
        }

        fn is_cable_connected(&self) -> bool {
            self.connected.load(Ordering::Relaxed)
        }
    }

    fn session(resolution: Option<(u32, u32)>) -> (Arc<RecordingOutput>, MirrorSession) {
        let output = Arc::new(RecordingOutput::new(resolution));
        let session = MirrorSession::new(output.clone());
        (output, session)
    }

    #[test]
    fn connect_disconnect_cycle() {
        let (output, session) = session(Some((1280, 720)));
        assert!(!session.is_mirroring());

        let mode = session.on_cable_connect().unwrap();
        assert_eq!((mode.width, mode.height), (1280, 720));
        assert!(session.is_mirroring());
        assert_eq!(session.phase(), MirrorPhase::Mirroring);
        assert_eq!(
            output.take_calls(),
            vec![
                Call::BestResolution,
                Call::SetMode(1280, 720),
                Call::Start(MirrorReason::Connect),
            ]
        );

        session.on_cable_disconnect();
        assert!(!session.is_mirroring());
        assert_eq!(session.phase(), MirrorPhase::Disconnected);
        assert_eq!(output.take_calls(), vec![Call::Stop(MirrorReason::Disconnect)]);
    }

    #[test]
    fn connect_without_resolution_still_starts() {
        let (output, session) = session(None);
        assert!(matches!(session.on_cable_connect(), Err(MirrorError::NoResolution)));
        assert!(session.is_mirroring());
        assert_eq!(
            output.take_calls(),
            vec![Call::BestResolution, Call::Start(MirrorReason::Connect)]
        );
    }

    #[test]
    fn preempt_and_resume() {
        let (output, session) = session(Some((1920, 1080)));
        session.on_cable_connect().unwrap();
        output.take_calls();

        assert!(session.on_external_enable_request());
        assert_eq!(session.phase(), MirrorPhase::Disabled);
        assert!(session.is_mirroring());
        assert_eq!(output.take_calls(), vec![Call::Stop(MirrorReason::Preempt)]);

        let mode = session.on_external_disable_request().unwrap();
        assert_eq!(mode.map(|m| m.width), Some(1920));
        assert_eq!(session.phase(), MirrorPhase::Mirroring);
        assert_eq!(
            output.take_calls(),
            vec![
                Call::BestResolution,
                Call::SetMode(1920, 1080),
                Call::Start(MirrorReason::Resume),
                Call::BestResolution,
                Call::SetMode(1920, 1080),
            ]
        );
    }

    #[test]
    fn enable_request_succeeds_when_idle() {
        let (output, session) = session(Some((1280, 720)));
        assert!(session.on_external_enable_request());
        assert_eq!(session.phase(), MirrorPhase::Disconnected);
        assert_eq!(output.take_calls(), vec![Call::Stop(MirrorReason::Preempt)]);
    }

    #[test]
    fn resume_is_noop_without_mirroring_or_cable() {
        let (output, session) = session(Some((1280, 720)));
        assert!(session.on_external_disable_request().unwrap().is_none());
        assert!(output.take_calls().is_empty());

        session.on_cable_connect().unwrap();
        output.take_calls();
        output.connected.store(false, Ordering::Relaxed);
        assert!(session.on_external_disable_request().unwrap().is_none());
        assert!(output.take_calls().is_empty());
    }

    #[test]
    fn reason_codes() {
        assert_eq!(MirrorReason::Connect.code(), 0);
        assert_eq!(MirrorReason::Disconnect.code(), 0);
        assert_eq!(MirrorReason::Preempt.code(), 1);
        assert_eq!(MirrorReason::Resume.code(), 1);
        assert_eq!(MirrorReason::Resume.to_string(), "resume");
    }

    #[test]
    fn rejected_mode_is_reported_but_mirroring_starts() {
        let (output, session) = session(Some((1280, 720)));
        output.reject_modes.store(true, Ordering::Relaxed);

        assert!(matches!(session.on_cable_connect(), Err(MirrorError::ModeSet(_))));
        assert!(session.is_mirroring());
        assert_eq!(session.phase(), MirrorPhase::Mirroring);
        assert_eq!(
            output.take_calls(),
            vec![
                Call::BestResolution,
                Call::SetMode(1280, 720),
                Call::Start(MirrorReason::Connect),
            ]
        );
    }

    #[test]
    fn resume_reports_failed_first_mode() {
        let (output, session) = session(Some((1920, 1080)));
        session.on_cable_connect().unwrap();
        session.on_external_enable_request();
        output.take_calls();

        output.missing_reads.store(1, Ordering::Relaxed);
        assert!(matches!(
            session.on_external_disable_request(),
            Err(MirrorError::NoResolution)
        ));
        assert_eq!(session.phase(), MirrorPhase::Mirroring);
        assert_eq!(
            output.take_calls(),
            vec![
                Call::BestResolution,
                Call::Start(MirrorReason::Resume),
                Call::BestResolution,
                Call::SetMode(1920, 1080),
            ]
        );
    }
}
