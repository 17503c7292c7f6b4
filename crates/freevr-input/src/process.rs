//! The input-polling process: owns a subset of the devices and polls them
//! in a paced loop until told to stop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::context::InputContext;
use crate::device::InputDevice;
use crate::sync::{process_sync, SyncBarrier};
use crate::{InputError, InputResult};

pub const STATS_SLEEP: &str = "sleep";
pub const STATS_SYNC: &str = "sync";
pub const STATS_FREEZE: &str = "freeze";

const DEFAULT_STATS_FRAMES: usize = 64;

/// Ring of per-frame durations, one column per label.
#[derive(Debug, Clone)]
pub struct ProcessStats {
    labels: Vec<String>,
    frames: VecDeque<Vec<Duration>>,
    capacity: usize,
    current: Vec<Duration>,
    last_mark: Instant,
}

impl ProcessStats {
    pub fn new(labels: Vec<String>, capacity: usize) -> Self {
        let columns = labels.len();
        Self {
            labels,
            frames: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            current: vec![Duration::ZERO; columns],
            last_mark: Instant::now(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Charges the time since the previous mark to column `idx`.
    pub fn mark(&mut self, idx: usize) {
        let now = Instant::now();
        if let Some(slot) = self.current.get_mut(idx) {
            *slot += now - self.last_mark;
        }
        self.last_mark = now;
    }

    pub fn mark_label(&mut self, label: &str) {
        match self.index_of(label) {
            Some(idx) => self.mark(idx),
            None => self.last_mark = Instant::now(),
        }
    }

    /// Closes the current frame, evicting the oldest once full.
    pub fn end_frame(&mut self) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        let columns = self.labels.len();
        let done = std::mem::replace(&mut self.current, vec![Duration::ZERO; columns]);
        self.frames.push_back(done);
    }

    pub fn frames(&self) -> impl Iterator<Item = &[Duration]> {
        self.frames.iter().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Mean of column `idx` over the recorded frames.
    pub fn mean(&self, idx: usize) -> Duration {
        if self.frames.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.frames.iter().filter_map(|f| f.get(idx)).sum();
        total / self.frames.len() as u32
    }
}

/// One polling process over some of the context's devices.
#[derive(Debug)]
pub struct InputProcess {
    ctx: Arc<InputContext>,
    devices: Vec<usize>,
    end_proc: Arc<AtomicBool>,
    frame_count: u64,
    stats: ProcessStats,
}

impl InputProcess {
    /// A process owning the named devices.
    pub fn new(ctx: Arc<InputContext>, device_names: &[&str]) -> InputResult<Self> {
        let devices = device_names
            .iter()
            .map(|name| {
                ctx.devices()
                    .iter()
                    .position(|d| d.name().eq_ignore_ascii_case(name))
                    .ok_or_else(|| InputError::Device(format!("no input device named '{name}'")))
            })
            .collect::<InputResult<Vec<_>>>()?;
        Ok(Self::with_indices(ctx, devices))
    }

    /// A process owning every configured device.
    pub fn all(ctx: Arc<InputContext>) -> Self {
        let devices = (0..ctx.devices().len()).collect();
        Self::with_indices(ctx, devices)
    }

    fn with_indices(ctx: Arc<InputContext>, devices: Vec<usize>) -> Self {
        let mut labels: Vec<String> = devices
            .iter()
            .map(|&idx| ctx.devices()[idx].name().to_string())
            .collect();
        labels.extend([STATS_SLEEP, STATS_SYNC, STATS_FREEZE].map(String::from));
        Self {
            ctx,
            devices,
            end_proc: Arc::new(AtomicBool::new(false)),
            frame_count: 0,
            stats: ProcessStats::new(labels, DEFAULT_STATS_FRAMES),
        }
    }

    pub fn context(&self) -> &Arc<InputContext> {
        &self.ctx
    }

    pub fn devices(&self) -> impl Iterator<Item = &InputDevice> {
        self.devices.iter().map(|&idx| &self.ctx.devices()[idx])
    }

    /// Shared flag that stops [`InputProcess::main_loop`] once set.
    pub fn end_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.end_proc)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn stats(&self) -> &ProcessStats {
        &self.stats
    }

    /// Creates every owned device, then opens them.
    ///
    /// A device that fails to open stays non-operating and is skipped by
    /// polling; a failed create is returned.
    pub fn init(&self) -> InputResult<()> {
        for device in self.devices() {
            device.create(Arc::downgrade(&self.ctx))?;
        }
        for device in self.devices() {
            if let Err(err) = device.open() {
                warn!("unable to open input device '{}': {err}", device.name());
            }
        }
        info!("input process owns {} devices", self.devices.len());
        Ok(())
    }

    /// Polls every owned device once.
    pub fn one_frame(&mut self) {
        self.frame_count += 1;
        for (column, &idx) in self.devices.iter().enumerate() {
            let device = &self.ctx.devices()[idx];
            trace!("about to poll inputs from device {}", device.name());
            if let Err(err) = device.poll() {
                warn!("polling '{}': {err}", device.name());
            }
            self.stats.mark(column);
        }
    }

    /// Paced poll loop. Runs until the end flag is set or the barrier
    /// times out.
    pub fn main_loop(&mut self, barrier: Option<&dyn SyncBarrier>, designated: bool) -> InputResult<()> {
        let min_frame = Duration::from_micros(self.ctx.config().min_frame_usec);
        let timeout = self.ctx.config().barrier_timeout_ms.map(Duration::from_millis);
        let mut loop_start = Instant::now();
        debug!("input loop beginning");

        while !self.end_proc.load(Ordering::Acquire) {
            if let Some(rest) = min_frame.checked_sub(loop_start.elapsed()) {
                thread::sleep(rest);
            }
            self.stats.mark_label(STATS_SLEEP);

            let froze = if barrier.is_some() || designated {
                process_sync(&self.ctx, barrier, designated, timeout)?
            } else {
                false
            };
            self.stats.mark_label(if froze { STATS_FREEZE } else { STATS_SYNC });

            loop_start = Instant::now();
            self.one_frame();
            self.stats.end_frame();
        }

        debug!("input loop ending after {} frames", self.frame_count);
        Ok(())
    }

    /// Closes every owned device.
    pub fn term(&self) {
        for device in self.devices() {
            if let Err(err) = device.close() {
                warn!("closing '{}': {err}", device.name());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use freevr_common::{DeviceConfig, InputConfig, InputDecl};

    use super::*;
    use crate::device::DriverRegistry;
    use crate::types::InputType;

    fn config() -> InputConfig {
        InputConfig {
            min_frame_usec: 1_000,
            devices: vec![DeviceConfig {
                name: "wand".to_string(),
                driver: "static".to_string(),
                inputs: vec![InputDecl {
                    name: "wave".to_string(),
                    desc: "valuator(wand:sinewave[1.0])".to_string(),
                    ..InputDecl::default()
                }],
                ..DeviceConfig::default()
            }],
            ..InputConfig::default()
        }
    }

    #[test]
    fn stats_ring_evicts_oldest() {
        let mut stats = ProcessStats::new(vec!["a".into(), "b".into()], 2);
        for _ in 0..3 {
            stats.mark(0);
            stats.mark_label("b");
            stats.end_frame();
        }
        assert_eq!(stats.len(), 2);
        assert!(stats.frames().all(|f| f.len() == 2));
        assert_eq!(stats.index_of("b"), Some(1));
        assert_eq!(stats.index_of("c"), None);
    }

    #[test]
    fn labels_are_devices_then_phases() {
        let ctx = InputContext::new(config(), &DriverRegistry::with_builtin()).unwrap();
        let proc = InputProcess::all(ctx);
        assert_eq!(proc.stats().labels(), ["wand", "sleep", "sync", "freeze"]);
    }

    #[test]
    fn unknown_device_is_rejected() {
        let ctx = InputContext::new(config(), &DriverRegistry::with_builtin()).unwrap();
        assert!(InputProcess::new(Arc::clone(&ctx), &["WAND"]).is_ok());
        assert!(InputProcess::new(ctx, &["glove"]).is_err());
    }

    #[test]
    fn one_frame_polls_owned_devices() {
        let ctx = InputContext::new(config(), &DriverRegistry::with_builtin()).unwrap();
        let mut proc = InputProcess::all(Arc::clone(&ctx));
        proc.init().unwrap();
        assert!(ctx.all_devices_open());
        ctx.create_input_map();

        proc.one_frame();
        proc.one_frame();
        assert_eq!(proc.frame_count(), 2);
        let wave = ctx.get_from_type_index(InputType::Valuator, 0).unwrap();
        assert!(!wave.is_dummy());
        assert!(wave.timestamp().is_some());

        proc.term();
        assert!(!ctx.all_devices_open());
    }

    #[test]
    fn main_loop_stops_on_the_end_flag() {
        let ctx = InputContext::new(config(), &DriverRegistry::with_builtin()).unwrap();
        let mut proc = InputProcess::all(Arc::clone(&ctx));
        proc.init().unwrap();
        ctx.create_input_map();

        let end = proc.end_handle();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            end.store(true, Ordering::Release);
        });
        proc.main_loop(None, true).unwrap();
        stopper.join().unwrap();

        assert!(proc.frame_count() > 0);
        assert_eq!(proc.stats().len() as u64, proc.frame_count().min(64));
        let wave = ctx.get_from_type_index(InputType::Valuator, 0).unwrap();
        let frozen = wave.visren_valuator();
        assert!((-1.0..=1.0).contains(&frozen));
    }
}
