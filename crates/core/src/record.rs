use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use log::info;
use crate::device::{Device, DeviceInfo, LogcatOpts};
use crate::errors::{Error, Result};
use crate::pack::Packer;
use crate::trace::TraceParser;

/// Exit statuses of the underlying log reader that mean normal termination.
/// A source that simply stops yielding lines counts as normal too.
pub const NORMAL_EXIT_CODES: [i32; 3] = [0, 2, 130];

/// Pulls trace lines into the parser and accumulates packed events until the
/// source dries up or an interrupt is requested.
pub struct Recorder {
    parser: TraceParser,
    packer: Packer,
    interrupted: Arc<AtomicBool>,
}

impl Recorder {
    pub fn new(device: DeviceInfo, decode: bool, interrupted: Arc<AtomicBool>) -> Recorder {
        Recorder {
            parser: TraceParser::new(device.clone(), decode),
            packer: Packer::new(device),
            interrupted,
        }
    }

    pub fn packer(&self) -> &Packer {
        &self.packer
    }

    pub fn record<I>(&mut self, lines: I) -> Result<()>
    where I: IntoIterator<Item = Result<String>> {
        for line in lines {
            if self.interrupted.load(Ordering::Relaxed) {
                info!("interrupted, keeping {} recorded events", self.packer.packs().len());
                break;
            }
            let line = match line {
                Ok(line) => line,
                Err(Error::Process { code, .. }) if NORMAL_EXIT_CODES.contains(&code) => {
                    info!("trace source ended with status {}", code);
                    break;
                },
                Err(e) => return Err(e),
            };
            self.parser.feed(&line, &mut self.packer)?;
        }
        Ok(())
    }

    /// Streams the trace straight from the device's log buffer.
    pub fn record_device(&mut self, device: &mut dyn Device, opts: &LogcatOpts) -> Result<()> {
        let lines = device.logcat(opts)?;
        self.record(lines)
    }

    /// Records from *lines* and flushes the archive to *path* in one write.
    /// Interrupts flush what was gathered so far; a parse failure aborts
    /// without writing.
    pub fn record_to<I, P>(&mut self, lines: I, path: P) -> Result<()>
    where I: IntoIterator<Item = Result<String>>,
          P: AsRef<Path> {
        self.record(lines)?;
        self.packer.save(&path)?;
        info!("saved {} events to {}", self.packer.packs().len(), path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use crate::replay::replay_archive;
    use crate::settings::{ReplaySettings, StrategyKind};
    use crate::testing::MockDevice;

    fn trace() -> Vec<Result<String>> {
        [
            "com.x ACTIVITY_BEGIN .Main",
            "DecorView@5e6f7a[MainActivity]",
            "com.x ACTIVITY_END .Main",
            "com.x TAP 1000 25 25",
        ].iter().map(|line| Ok(line.to_string())).collect()
    }

    #[test]
    fn records_until_the_source_ends() {
        let mut recorder = Recorder::new(DeviceInfo::default(), false, Arc::new(AtomicBool::new(false)));
        recorder.record(trace()).unwrap();
        assert_eq!(recorder.packer().packs().len(), 1);
    }

    #[test]
    fn normal_process_exits_are_not_errors() {
        let mut recorder = Recorder::new(DeviceInfo::default(), false, Arc::new(AtomicBool::new(false)));
        let mut lines = trace();
        lines.push(Err(Error::Process { code: 130, stderr: String::new() }));
        recorder.record(lines).unwrap();
        assert_eq!(recorder.packer().packs().len(), 1);
    }

    #[test]
    fn abnormal_process_exits_propagate() {
        let mut recorder = Recorder::new(DeviceInfo::default(), false, Arc::new(AtomicBool::new(false)));
        let lines = vec![Err(Error::Process { code: 1, stderr: "boom".to_string() })];
        let err = recorder.record(lines).unwrap_err();
        assert!(matches!(err, Error::Process { code: 1, .. }));
    }

    #[test]
    fn interrupts_stop_the_recording_cleanly() {
        let interrupted = Arc::new(AtomicBool::new(false));
        let mut recorder = Recorder::new(DeviceInfo::default(), false, Arc::clone(&interrupted));
        interrupted.store(true, Ordering::Relaxed);
        recorder.record(trace()).unwrap();
        assert_eq!(recorder.packer().packs().len(), 0);
    }

    #[test]
    fn parse_failures_abort_the_session() {
        let mut recorder = Recorder::new(DeviceInfo::default(), false, Arc::new(AtomicBool::new(false)));
        let lines = vec![Ok("com.x TAP 1000 25 25".to_string())];
        let err = recorder.record(lines).unwrap_err();
        assert!(matches!(err, Error::IllegalState(_)));
    }

    #[test]
    fn full_pipeline_round_trip() {
        let mut device = MockDevice::new();
        device.trace = [
            "com.x ACTIVITY_BEGIN .Main",
            "DecorView@5e6f7a[MainActivity]",
            r#" android.widget.Button{1a2b3c V.ED..C.. ........ 40,40-60,60 dx-tx=0 dx-ty=0 dx-tz=0 dx-sx=0 dx-sy=0 dx-desc="" dx-text="GO"}"#,
            "com.x ACTIVITY_END .Main",
            "com.x TAP 1000 50 50",
            "com.x ACTIVITY_BEGIN .Main",
            "DecorView@5e6f7a[MainActivity]",
            "com.x ACTIVITY_END .Main",
            "com.x KEY 2000 4 KEYCODE_BACK",
        ].iter().map(|line| Ok(line.to_string())).collect();

        let mut recorder = Recorder::new(DeviceInfo::default(), false, Arc::new(AtomicBool::new(false)));
        recorder.record_device(&mut device, &LogcatOpts::default()).unwrap();
        assert_eq!(recorder.packer().packs().len(), 2);

        let dumped = recorder.packer().dump();
        let mut loaded = Packer::load(&dumped).unwrap();
        assert_eq!(loaded.dump(), dumped);

        let settings = ReplaySettings {
            strategy: StrategyKind::Px,
            time_sensitive: false,
            lookahead: 3,
        };
        let mut replay_device = MockDevice::new();
        replay_archive(&mut loaded, &mut replay_device, &settings).unwrap();
        assert_eq!(replay_device.calls, vec!["tap 50 50", "key KEYCODE_BACK"]);
    }
}
