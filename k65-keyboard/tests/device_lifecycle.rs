//! Integration tests for the keyboard lifecycle against a recording transport.
//!
//! No hardware needed: every transfer is captured and answered in memory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use k65_keyboard::{
    AnimationEngine, BrightnessMode, Collaborators, Color, ColorWriter, DeviceProfile,
    DialBinding, EffectCatalog, EffectKind, EffectSettings, EngineContext, EngineError,
    EngineStatus, Keyboard, KeyboardError, KeyboardMap, KeyboardModel, KeyboardOptions,
    NoLayouts, ProfileCell, ProfileStore, StartOutcome, TemperatureCache,
};
use k65_transport::protocol::{cmd, data_type, COLOR_HEADER_SIZE};
use k65_transport::{InputReader, Target, Transport, TransportDeviceInfo, TransportError};
use parking_lot::Mutex;

const SERIAL: &str = "TEST0001";

#[derive(Debug, Clone, PartialEq)]
struct Record {
    opcode: Vec<u8>,
    payload: Vec<u8>,
    target: Target,
}

struct RecordingTransport {
    info: TransportDeviceInfo,
    log: Mutex<Vec<Record>>,
    fail_on: Option<&'static [u8]>,
    failures: AtomicUsize,
}

impl RecordingTransport {
    fn new(model: KeyboardModel) -> Arc<Self> {
        Arc::new(Self::build(model, None))
    }

    fn failing(model: KeyboardModel, opcode: &'static [u8]) -> Arc<Self> {
        Arc::new(Self::build(model, Some(opcode)))
    }

    fn build(model: KeyboardModel, fail_on: Option<&'static [u8]>) -> Self {
        Self {
            info: TransportDeviceInfo {
                vid: 0x1B1C,
                pid: model.product_id(),
                transport_type: model.transport_type(),
                device_path: "/dev/hidraw-test".into(),
                manufacturer: "Corsair".into(),
                product_name: model.product_name().into(),
                serial: SERIAL.into(),
            },
            log: Mutex::new(Vec::new()),
            fail_on,
            failures: AtomicUsize::new(0),
        }
    }

    fn records(&self) -> Vec<Record> {
        self.log.lock().clone()
    }

    fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.log.lock().clear();
    }
}

impl Transport for RecordingTransport {
    fn transfer(
        &self,
        opcode: &[u8],
        payload: &[u8],
        target: Target,
    ) -> Result<Vec<u8>, TransportError> {
        if self.fail_on == Some(opcode) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Err(TransportError::Timeout);
        }
        self.log.lock().push(Record {
            opcode: opcode.to_vec(),
            payload: payload.to_vec(),
            target,
        });
        if opcode == cmd::GET_FIRMWARE {
            // 1.2.4660
            return Ok(vec![0x02, 0x13, 0x00, 0x01, 0x02, 0x34, 0x12, 0x00]);
        }
        Ok(vec![0u8; 64])
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }
}

#[derive(Default)]
struct MemoryStore {
    profiles: Mutex<HashMap<String, DeviceProfile>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    fn with(profile: DeviceProfile) -> Arc<Self> {
        let store = Self::default();
        store.profiles.lock().insert(profile.serial.clone(), profile);
        Arc::new(store)
    }

    fn stored(&self) -> Option<DeviceProfile> {
        self.profiles.lock().get(SERIAL).cloned()
    }
}

impl ProfileStore for MemoryStore {
    fn load(&self, serial: &str) -> Result<Option<DeviceProfile>, KeyboardError> {
        Ok(self.profiles.lock().get(serial).cloned())
    }

    fn save(&self, profile: &DeviceProfile) -> Result<(), KeyboardError> {
        *self.saves.lock() += 1;
        self.profiles
            .lock()
            .insert(profile.serial.clone(), profile.clone());
        Ok(())
    }
}

/// Dial reader that hands out a fixed script of reports, then idles
struct ScriptedDial {
    reports: Vec<[u8; 64]>,
}

impl InputReader for ScriptedDial {
    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError> {
        match self.reports.pop() {
            Some(report) => {
                let n = report.len().min(buf.len());
                buf[..n].copy_from_slice(&report[..n]);
                Ok(n)
            }
            None => {
                std::thread::sleep(Duration::from_millis(timeout_ms.max(0) as u64));
                Ok(0)
            }
        }
    }
}

/// Dial reader fed by the test, one report per send
struct ChannelDial {
    rx: Receiver<[u8; 64]>,
}

impl ChannelDial {
    fn new() -> (Sender<[u8; 64]>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }
}

impl InputReader for ChannelDial {
    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError> {
        let timeout = Duration::from_millis(timeout_ms.max(0) as u64);
        match self.rx.recv_timeout(timeout) {
            Ok(report) => {
                let n = report.len().min(buf.len());
                buf[..n].copy_from_slice(&report[..n]);
                Ok(n)
            }
            Err(_) => Ok(0),
        }
    }
}

fn rotate_right() -> [u8; 64] {
    let mut report = [0u8; 64];
    report[4] = 0x01;
    report
}

fn options() -> KeyboardOptions {
    KeyboardOptions {
        keep_alive_interval: Duration::from_secs(60),
        telemetry_interval: Duration::from_secs(60),
        led_settle: Duration::ZERO,
        ..Default::default()
    }
}

fn profile(model: KeyboardModel, effect: &str) -> DeviceProfile {
    let mut p = DeviceProfile::new(model.product_name(), SERIAL, "US", KeyboardMap::default());
    p.rgb_profile = effect.to_string();
    p
}

fn solid(color: Color, brightness: f64) -> EffectSettings {
    EffectSettings {
        start_color: Some(color),
        end_color: Some(color),
        brightness,
        ..Default::default()
    }
}

fn collaborators(store: Arc<MemoryStore>, catalog: EffectCatalog) -> Collaborators {
    Collaborators {
        store,
        layouts: Arc::new(NoLayouts),
        catalog: Arc::new(catalog),
        temperatures: None,
        volume: None,
        dial: None,
    }
}

/// Reassemble the wired color frames found in a transfer log
fn wired_frames(records: &[Record]) -> Vec<Vec<u8>> {
    let mut frames: Vec<Vec<u8>> = Vec::new();
    for r in records {
        if r.opcode == cmd::WRITE_COLOR_WIRED {
            frames.push(r.payload.clone());
        } else if r.opcode == cmd::SUB_COLOR_WIRED {
            if let Some(last) = frames.last_mut() {
                last.extend_from_slice(&r.payload);
            }
        }
    }
    let skip = COLOR_HEADER_SIZE + data_type::SET_COLOR_WIRED.len();
    frames.into_iter().map(|f| f[skip..].to_vec()).collect()
}

fn wait_for(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_init_reads_firmware_and_enters_software_mode() {
    let model = KeyboardModel::K65Plus;
    let transport = RecordingTransport::new(model);
    let store = MemoryStore::with(profile(model, "off"));
    let kb = Keyboard::init(
        model,
        transport.clone(),
        collaborators(store, EffectCatalog::builtin()),
        options(),
    )
    .unwrap();

    assert_eq!(kb.current_firmware_version(), "1.2.4660");
    assert_eq!(kb.dongle_firmware_version(), None);

    let records = transport.records();
    assert_eq!(records[0].opcode, cmd::SOFTWARE_MODE);
    assert_eq!(records[1].opcode, cmd::ACTIVATE_LED_WIRED);
    assert_eq!(records[2].opcode, cmd::GET_FIRMWARE);
    assert!(records
        .iter()
        .any(|r| r.opcode == cmd::BRIGHTNESS && r.payload == vec![0xE8, 0x03]));
    assert!(!records.iter().any(|r| r.opcode == cmd::SLEEP_TIMER));
    kb.stop();
}

#[test]
fn test_first_run_creates_profile() {
    let model = KeyboardModel::K65Plus;
    let transport = RecordingTransport::new(model);
    let store = Arc::new(MemoryStore::default());
    let kb = Keyboard::init(
        model,
        transport,
        collaborators(store.clone(), EffectCatalog::builtin()),
        options(),
    )
    .unwrap();

    let saved = store.stored().unwrap();
    assert_eq!(saved.serial, SERIAL);
    assert_eq!(saved.rgb_profile, "keyboard");
    assert_eq!(kb.profile().as_ref(), &saved);
    kb.stop();
}

#[test]
fn test_wireless_init_queries_dongle() {
    let model = KeyboardModel::K65PlusWireless;
    let transport = RecordingTransport::new(model);
    let store = MemoryStore::with(profile(model, "rain"));
    let kb = Keyboard::init(
        model,
        transport.clone(),
        collaborators(store, EffectCatalog::builtin()),
        options(),
    )
    .unwrap();

    assert_eq!(kb.dongle_firmware_version(), Some("1.2.4660"));
    let records = transport.records();
    let modes: Vec<Target> = records
        .iter()
        .filter(|r| r.opcode == cmd::SOFTWARE_MODE)
        .map(|r| r.target)
        .collect();
    assert_eq!(modes, vec![Target::Dongle, Target::Keyboard]);
    // 15 minutes in milliseconds
    assert!(records
        .iter()
        .any(|r| r.opcode == cmd::SLEEP_TIMER && r.payload == 900_000u32.to_le_bytes().to_vec()));
    kb.stop();
}

#[test]
fn test_init_fails_on_firmware_timeout() {
    let model = KeyboardModel::K65Plus;
    let transport = RecordingTransport::failing(model, cmd::GET_FIRMWARE);
    let store = MemoryStore::with(profile(model, "colorshift"));
    let result = Keyboard::init(
        model,
        transport.clone(),
        collaborators(store, EffectCatalog::builtin()),
        options(),
    );
    assert!(matches!(
        result,
        Err(KeyboardError::Transport(TransportError::Timeout))
    ));
    // Nothing past the failed step was sent
    assert!(!transport
        .records()
        .iter()
        .any(|r| r.opcode == cmd::WRITE_COLOR_WIRED));
}

#[test]
fn test_static_effect_brightness() {
    let model = KeyboardModel::K65Plus;
    let transport = RecordingTransport::new(model);
    let mut catalog = EffectCatalog::builtin();
    catalog.insert("static", solid(Color::rgb(255, 0, 0), 0.5));
    let store = MemoryStore::with(profile(model, "static"));
    let kb = Keyboard::init(model, transport.clone(), collaborators(store, catalog), options())
        .unwrap();

    assert_eq!(kb.engine_status(), EngineStatus::Idle);
    let frames = wired_frames(&transport.records());
    // Reset frame, then the static frame
    assert_eq!(frames.len(), 2);
    assert!(frames[0].iter().all(|&b| b == 0));
    let frame = &frames[1];
    assert_eq!(frame.len(), model.led_channels() * 3);
    assert_eq!(&frame[0..3], &[128, 0, 0]);
    // Reserved slot stays dark
    assert_eq!(&frame[3..6], &[0, 0, 0]);
    assert_eq!(&frame[6..9], &[128, 0, 0]);
    assert_eq!(&frame[frame.len() - 3..], &[128, 0, 0]);
    kb.stop();
}

#[test]
fn test_brightness_mode_overrides_effect() {
    let model = KeyboardModel::K65Plus;
    let transport = RecordingTransport::new(model);
    let mut catalog = EffectCatalog::builtin();
    catalog.insert("static", solid(Color::rgb(0, 0, 255), 1.0));
    let store = MemoryStore::with(profile(model, "static"));
    let kb = Keyboard::init(
        model,
        transport.clone(),
        collaborators(store.clone(), catalog),
        options(),
    )
    .unwrap();
    transport.clear();

    let outcome = kb.change_brightness_mode(BrightnessMode::High).unwrap();
    assert_eq!(outcome, StartOutcome::SingleFrame(k65_keyboard::EffectKind::Static));
    let frames = wired_frames(&transport.records());
    assert_eq!(&frames.last().unwrap()[6..9], &[0, 0, 255]);
    assert_eq!(store.stored().unwrap().brightness, BrightnessMode::High);
    kb.stop();
}

#[test]
fn test_replace_never_interleaves_sessions() {
    let model = KeyboardModel::K65Plus;
    let transport = RecordingTransport::new(model);
    let mut catalog = EffectCatalog::builtin();
    catalog.insert("colorshift", solid(Color::rgb(255, 0, 0), 1.0));
    catalog.insert("static", solid(Color::rgb(0, 255, 0), 1.0));
    let store = MemoryStore::with(profile(model, "colorshift"));
    let kb = Keyboard::init(model, transport.clone(), collaborators(store, catalog), options())
        .unwrap();

    assert_eq!(
        kb.engine_status(),
        EngineStatus::Running(k65_keyboard::EffectKind::ColorShift)
    );
    assert!(wait_for(|| wired_frames(&transport.records()).len() >= 4));

    kb.update_rgb_profile("static").unwrap();
    assert_eq!(kb.engine_status(), EngineStatus::Idle);
    std::thread::sleep(Duration::from_millis(100));

    let frames = wired_frames(&transport.records());
    let is_red = |f: &Vec<u8>| f[6] == 255 && f[7] == 0;
    let is_green = |f: &Vec<u8>| f[6] == 0 && f[7] == 255;
    let first_red = frames.iter().position(is_red).expect("old session wrote frames");
    let first_new = first_red
        + frames[first_red..]
            .iter()
            .position(|f| !is_red(f))
            .expect("new session wrote frames");
    assert!(frames[first_new..].iter().all(|f| !is_red(f)));
    assert!(is_green(frames.last().unwrap()));
    kb.stop();
}

#[test]
fn test_unknown_effect_is_rejected() {
    let model = KeyboardModel::K65PlusWireless;
    let transport = RecordingTransport::new(model);
    let store = MemoryStore::with(profile(model, "rain"));
    let kb = Keyboard::init(
        model,
        transport,
        collaborators(store.clone(), EffectCatalog::builtin()),
        options(),
    )
    .unwrap();

    // Host-rendered only
    assert!(matches!(
        kb.update_rgb_profile("storm"),
        Err(KeyboardError::InvalidParameter(_))
    ));
    assert_eq!(store.stored().unwrap().rgb_profile, "rain");
    kb.stop();
}

#[test]
fn test_offloaded_effect_written_once() {
    let model = KeyboardModel::K65PlusWireless;
    let transport = RecordingTransport::new(model);
    let store = MemoryStore::with(profile(model, "colorwave"));
    let kb = Keyboard::init(
        model,
        transport.clone(),
        collaborators(store, EffectCatalog::builtin()),
        options(),
    )
    .unwrap();
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(kb.engine_status(), EngineStatus::Idle);
    let writes = transport
        .records()
        .iter()
        .filter(|r| r.opcode == cmd::WRITE_COLOR_WIRELESS)
        .count();
    assert_eq!(writes, 1);
    kb.stop();
}

#[test]
fn test_stop_returns_control_to_firmware() {
    let model = KeyboardModel::K65PlusWireless;
    let transport = RecordingTransport::new(model);
    let store = MemoryStore::with(profile(model, "rain"));
    let kb = Keyboard::init(
        model,
        transport.clone(),
        collaborators(store, EffectCatalog::builtin()),
        options(),
    )
    .unwrap();
    transport.clear();

    kb.stop();
    let records = transport.records();
    let trigger = records
        .iter()
        .position(|r| r.opcode == cmd::WRITE_COLOR_WIRELESS)
        .unwrap();
    let modes: Vec<(usize, Target)> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.opcode == cmd::HARDWARE_MODE)
        .map(|(i, r)| (i, r.target))
        .collect();
    assert_eq!(modes.len(), 2);
    assert!(trigger < modes[0].0);
    assert_eq!(modes[0].1, Target::Keyboard);
    assert_eq!(modes[1].1, Target::Dongle);

    // Second stop is a no-op
    transport.clear();
    kb.stop();
    assert!(transport.records().is_empty());
    assert!(kb.apply_brightness(200).is_err());
}

#[test]
fn test_wired_stop_halts_render_loop() {
    let model = KeyboardModel::K65Plus;
    let transport = RecordingTransport::new(model);
    let store = MemoryStore::with(profile(model, "rainbow"));
    let kb = Keyboard::init(
        model,
        transport.clone(),
        collaborators(store, EffectCatalog::builtin()),
        options(),
    )
    .unwrap();
    assert!(wait_for(|| wired_frames(&transport.records()).len() >= 3));

    kb.stop();
    assert_eq!(kb.engine_status(), EngineStatus::Idle);
    let records = transport.records();
    assert_eq!(records.last().unwrap().opcode, cmd::HARDWARE_MODE);
    let count = records.len();
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(transport.records().len(), count);
}

#[test]
fn test_dial_rotation_changes_brightness() {
    let model = KeyboardModel::K65Plus;
    let transport = RecordingTransport::new(model);
    let mut p = profile(model, "off");
    p.control_dial = DialBinding::Brightness;
    p.brightness_level = 500;
    let store = MemoryStore::with(p);
    let mut collab = collaborators(store.clone(), EffectCatalog::builtin());
    collab.dial = Some(Box::new(ScriptedDial {
        reports: vec![rotate_right(); 3],
    }));
    let kb = Keyboard::init(model, transport.clone(), collab, options()).unwrap();

    assert!(wait_for(|| kb.profile().brightness_level == 800));
    assert!(wait_for(|| store.stored().unwrap().brightness_level == 800));
    assert!(transport
        .records()
        .iter()
        .any(|r| r.opcode == cmd::BRIGHTNESS && r.payload == 800u16.to_le_bytes().to_vec()));
    kb.stop();
}

#[test]
fn test_profile_mutations_persist() {
    let model = KeyboardModel::K65Plus;
    let transport = RecordingTransport::new(model);
    let store = MemoryStore::with(profile(model, "off"));
    let kb = Keyboard::init(
        model,
        transport,
        collaborators(store.clone(), EffectCatalog::builtin()),
        options(),
    )
    .unwrap();

    kb.update_label("Desk").unwrap();
    kb.update_control_dial(DialBinding::Brightness).unwrap();
    kb.save_keyboard_profile("gaming").unwrap();
    kb.switch_keyboard_profile("gaming").unwrap();
    assert!(kb.switch_keyboard_profile("missing").is_err());
    assert!(matches!(
        kb.update_sleep_timer(5),
        Err(KeyboardError::NotSupported(_))
    ));

    let saved = store.stored().unwrap();
    assert_eq!(saved.label, "Desk");
    assert_eq!(saved.control_dial, DialBinding::Brightness);
    assert_eq!(saved.profile, "gaming");
    assert_eq!(saved.profiles, vec!["default".to_string(), "gaming".to_string()]);

    kb.delete_keyboard_profile("gaming").unwrap();
    assert_eq!(store.stored().unwrap().profile, "default");
    kb.stop();
}

#[test]
fn test_applied_profile_resyncs_dial_brightness() {
    let model = KeyboardModel::K65Plus;
    let transport = RecordingTransport::new(model);
    let mut p = profile(model, "off");
    p.control_dial = DialBinding::Brightness;
    p.brightness_level = 500;
    let store = MemoryStore::with(p.clone());
    let (dial_tx, dial) = ChannelDial::new();
    let mut collab = collaborators(store.clone(), EffectCatalog::builtin());
    collab.dial = Some(Box::new(dial));
    let kb = Keyboard::init(model, transport.clone(), collab, options()).unwrap();

    p.brightness_level = 200;
    kb.apply_effect(p).unwrap();
    assert!(transport
        .records()
        .iter()
        .any(|r| r.opcode == cmd::BRIGHTNESS && r.payload == 200u16.to_le_bytes().to_vec()));

    dial_tx.send(rotate_right()).unwrap();
    assert!(wait_for(|| kb.profile().brightness_level != 200));
    assert_eq!(kb.profile().brightness_level, 300);
    assert!(wait_for(|| store.stored().unwrap().brightness_level == 300));
    kb.stop();
}

#[test]
fn test_unknown_effect_turns_lights_off() {
    let model = KeyboardModel::K65Plus;
    let transport = RecordingTransport::new(model);
    let store = MemoryStore::with(profile(model, "off"));
    let kb = Keyboard::init(
        model,
        transport.clone(),
        collaborators(store, EffectCatalog::builtin()),
        options(),
    )
    .unwrap();
    transport.clear();

    let outcome = kb.apply_effect(profile(model, "disco")).unwrap();
    assert_eq!(outcome, StartOutcome::Blanked);
    assert_eq!(kb.engine_status(), EngineStatus::Idle);
    let frames = wired_frames(&transport.records());
    assert!(!frames.is_empty());
    assert!(frames.iter().all(|f| f.iter().all(|&b| b == 0)));
    kb.stop();
}

#[test]
fn test_missing_catalog_entry_renders_off() {
    let model = KeyboardModel::K65Plus;
    let transport = RecordingTransport::new(model);
    let mut catalog = EffectCatalog::builtin();
    catalog.remove("rainbow");
    let store = MemoryStore::with(profile(model, "off"));
    let kb = Keyboard::init(model, transport.clone(), collaborators(store, catalog), options())
        .unwrap();
    transport.clear();

    let outcome = kb.apply_effect(profile(model, "rainbow")).unwrap();
    assert_eq!(outcome, StartOutcome::Looping(EffectKind::Rainbow));
    assert!(wait_for(|| wired_frames(&transport.records()).len() >= 3));
    let frames = wired_frames(&transport.records());
    assert!(frames.iter().all(|f| f.iter().all(|&b| b == 0)));
    assert_eq!(kb.engine_status(), EngineStatus::Running(EffectKind::Rainbow));
    kb.stop();
}

#[test]
fn test_render_loop_survives_write_failures() {
    let model = KeyboardModel::K65Plus;
    let transport = RecordingTransport::failing(model, cmd::WRITE_COLOR_WIRED);
    let store = MemoryStore::with(profile(model, "rainbow"));
    let kb = Keyboard::init(
        model,
        transport.clone(),
        collaborators(store, EffectCatalog::builtin()),
        options(),
    )
    .unwrap();

    let before = transport.failures();
    assert!(wait_for(|| transport.failures() >= before + 3));
    assert_eq!(kb.engine_status(), EngineStatus::Running(EffectKind::Rainbow));
    // A failed first chunk drops the rest of the frame
    assert!(!transport
        .records()
        .iter()
        .any(|r| r.opcode == cmd::SUB_COLOR_WIRED));
    kb.stop();
}

#[test]
fn test_engine_rejects_illegal_transitions() {
    let model = KeyboardModel::K65Plus;
    let transport: Arc<dyn Transport> = RecordingTransport::new(model);
    let mut engine = AnimationEngine::new(EngineContext {
        writer: Arc::new(ColorWriter::new(transport, model)),
        profile: ProfileCell::new(profile(model, "rainbow")),
        catalog: Arc::new(EffectCatalog::builtin()),
        temperatures: Arc::new(TemperatureCache::new()),
    });

    assert!(matches!(engine.cancel(), Err(EngineError::NotRunning(_))));
    assert_eq!(engine.status(), EngineStatus::Idle);

    assert_eq!(engine.start().unwrap(), StartOutcome::Looping(EffectKind::Rainbow));
    assert!(matches!(engine.start(), Err(EngineError::NotIdle { .. })));

    engine.cancel().unwrap();
    assert_eq!(engine.status(), EngineStatus::Cancelling);
    assert!(matches!(engine.start(), Err(EngineError::NotIdle { .. })));
    assert!(matches!(engine.cancel(), Err(EngineError::NotRunning(_))));

    engine.wait();
    assert_eq!(engine.status(), EngineStatus::Idle);
    assert_eq!(engine.replace().unwrap(), StartOutcome::Looping(EffectKind::Rainbow));
    engine.halt();
    assert_eq!(engine.status(), EngineStatus::Idle);
}

#[test]
fn test_stopped_keyboard_rejects_mutations() {
    let model = KeyboardModel::K65Plus;
    let transport = RecordingTransport::new(model);
    let store = MemoryStore::with(profile(model, "off"));
    let kb = Keyboard::init(
        model,
        transport,
        collaborators(store.clone(), EffectCatalog::builtin()),
        options(),
    )
    .unwrap();
    kb.stop();

    assert!(kb.update_label("Desk").is_err());
    assert!(kb.update_control_dial(DialBinding::Brightness).is_err());
    let saved = store.stored().unwrap();
    assert_eq!(saved.label, profile(model, "off").label);
    assert_eq!(saved.control_dial, DialBinding::Volume);
}

#[test]
fn test_concurrent_mutations_store_latest_profile() {
    let model = KeyboardModel::K65Plus;
    let transport = RecordingTransport::new(model);
    let store = MemoryStore::with(profile(model, "off"));
    let kb = Arc::new(
        Keyboard::init(
            model,
            transport,
            collaborators(store.clone(), EffectCatalog::builtin()),
            options(),
        )
        .unwrap(),
    );

    let handles: Vec<_> = (0..4u16)
        .map(|t| {
            let kb = Arc::clone(&kb);
            std::thread::spawn(move || {
                for i in 0..50u16 {
                    kb.apply_brightness(t * 100 + i).unwrap();
                    kb.update_label(&format!("desk-{}-{}", t, i)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(&store.stored().unwrap(), kb.profile().as_ref());
    kb.stop();
}
