//! End-to-end runs of a `Program` over scripted input and a captured sink.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use winter::keymap::{KeyDecoder, KeyTable};
use winter::output::{Output, SharedBuffer};
use winter::widgets::{Destination, Dialog, Field, Menu, MenuItem, Value};
use winter::{Context, Error, Key, Program, ProgramConfig, Screen, ScreenBox, Span};

const UP: &[u8] = b"\x1b[A";
const DOWN: &[u8] = b"\x1b[B";
const ENTER: &[u8] = b"\r";
const KILL: &[u8] = b"\x1b";

type Log = Rc<RefCell<Vec<String>>>;
type Calls = Rc<RefCell<Vec<Vec<Value>>>>;

fn script(parts: &[&[u8]]) -> VecDeque<u8> {
    parts.iter().flat_map(|p| p.iter().copied()).collect()
}

fn program(input: VecDeque<u8>) -> (Program, SharedBuffer) {
    let sink = SharedBuffer::new();
    let config = ProgramConfig::new(40, 15, Some("Scenario"), Key::Escape);
    let decoder = KeyDecoder::new(KeyTable::vt100(), input);
    (Program::new(&config, Output::new(sink.clone()), decoder), sink)
}

/// Screen that only records its lifecycle.
struct Probe {
    label: &'static str,
    log: Log,
}

impl Probe {
    fn boxed(label: &'static str, log: &Log) -> ScreenBox {
        Box::new(Probe { label, log: Rc::clone(log) })
    }
}

impl Screen for Probe {
    fn enter(&mut self, _ctx: &mut Context, previous: Option<ScreenBox>) -> winter::Result<()> {
        let from = previous.map(|p| p.name()).unwrap_or("nothing");
        self.log.borrow_mut().push(format!("{}.enter from {}", self.label, short(from)));
        Ok(())
    }

    fn keypress(&mut self, ctx: &mut Context, key: Key) -> winter::Result<()> {
        self.log.borrow_mut().push(format!("{}.key {}", self.label, key));
        if key == Key::Char('n') {
            ctx.switch_to(Probe::boxed("second", &self.log));
        }
        if key == Key::Char('!') {
            return Err(Error::screen("probe refused"));
        }
        Ok(())
    }

    fn exit(&mut self, _ctx: &mut Context, next: Option<&dyn Screen>) -> winter::Result<()> {
        let to = next.map(|n| n.name()).unwrap_or("nothing");
        self.log.borrow_mut().push(format!("{}.exit to {}", self.label, short(to)));
        Ok(())
    }
}

fn short(type_name: &str) -> &str {
    type_name.rsplit("::").next().unwrap_or(type_name)
}

fn recording_dialog(fields: Vec<Field>, calls: &Calls) -> Dialog {
    let calls = Rc::clone(calls);
    Dialog::new("Form", fields, move |values| {
        calls.borrow_mut().push(values.to_vec());
        Span::from("OK")
    })
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn int_field_keeps_the_last_valid_value() {
    let calls = Calls::default();
    let pin = Field::int("PIN").validate(|v| v.as_int().is_some_and(|p| p < 10_000));
    let dialog = recording_dialog(vec![pin], &calls);

    let (mut program, sink) = program(script(&[b"12345", ENTER, KILL]));
    program.run(Box::new(dialog)).unwrap();

    assert_eq!(*calls.borrow(), vec![vec![Value::Int(1234)]]);
    let out = sink.contents();
    assert!(out.contains("PIN\x1b[0m: 123 "));
    assert!(out.contains("PIN\x1b[0m: 1234"));
    assert!(!out.contains("12345"));
}

#[test]
fn menu_selection_clamps_and_runs_the_selected_item() {
    let chosen: Log = Rc::default();
    let item = |name: &'static str| {
        let chosen = Rc::clone(&chosen);
        MenuItem::new(name, move |_ctx| {
            chosen.borrow_mut().push(name.to_string());
            Ok(())
        })
    };
    let menu = Menu::new("Letters", vec![item("A"), item("B"), item("C")]);

    let (mut program, _sink) = program(script(&[DOWN, DOWN, DOWN, UP, ENTER, KILL]));
    program.run(Box::new(menu)).unwrap();

    assert_eq!(*chosen.borrow(), vec!["B"]);
}

#[test]
fn bool_field_converts_yes_and_no() {
    for (typed, expected) in [(&b"yes"[..], true), (&b"no"[..], false)] {
        let calls = Calls::default();
        let dialog = recording_dialog(vec![Field::bool("sure")], &calls);

        let (mut program, _sink) = program(script(&[typed, ENTER, KILL]));
        program.run(Box::new(dialog)).unwrap();

        assert_eq!(*calls.borrow(), vec![vec![Value::Bool(expected)]]);
    }
}

#[test]
fn submitted_dialog_shows_result_then_continues() {
    let log = Log::default();
    let calls = Calls::default();
    let dialog = recording_dialog(vec![Field::confirm("Continue?")], &calls)
        .then(Destination::Screen(Probe::boxed("after", &log)));

    let (mut program, sink) = program(script(&[ENTER, ENTER, KILL]));
    program.run(Box::new(dialog)).unwrap();

    assert_eq!(calls.borrow().len(), 1);
    assert!(sink.contents().contains(&format!("\x1b[9;2H{}OK", " ".repeat(19))));
    assert_eq!(log.borrow()[0], "after.enter from Message");
}

#[test]
fn dialog_back_key_returns_to_opener() {
    let calls = Calls::default();
    let opener = Rc::clone(&calls);
    let menu = Menu::new(
        "",
        vec![MenuItem::new("open", move |ctx| {
            ctx.switch_to(Box::new(recording_dialog(vec![Field::text("t")], &opener)));
            Ok(())
        })],
    );
    // open, type, ctrl+z back to the menu, enter again opens a fresh dialog
    let (mut program, sink) = program(script(&[ENTER, b"abc\x1a", ENTER, b"x", ENTER, KILL]));
    program.run(Box::new(menu)).unwrap();

    assert_eq!(*calls.borrow(), vec![vec![Value::Text("x".into())]]);
    assert!(sink.contents().contains("t\x1b[0m: abc"));
}

#[test]
fn vt100_and_console_tables_decode_differently() {
    let decode_all = |table: KeyTable, bytes: &[u8]| {
        let mut decoder = KeyDecoder::new(table, bytes.iter().copied().collect::<VecDeque<u8>>());
        let mut keys = Vec::new();
        while decoder.has_key(std::time::Duration::ZERO).unwrap() {
            keys.push(decoder.next_key().unwrap());
        }
        keys
    };

    assert_eq!(decode_all(KeyTable::vt100(), b"\x1b[A"), vec![Key::Up]);
    assert_eq!(
        decode_all(KeyTable::console(), b"\x1b[A"),
        vec![Key::Escape, Key::Char('['), Key::Char('A')]
    );
    assert_eq!(decode_all(KeyTable::console(), b"\xe0\x48"), vec![Key::Up]);
    assert_eq!(decode_all(KeyTable::console(), b"\x00\x3b"), vec![Key::F(1)]);
}

// ============================================================================
// LOOP
// ============================================================================

#[test]
fn transitions_exit_before_enter() {
    let log = Log::default();
    let (mut program, _sink) = program(script(&[b"n", b"z", KILL]));
    program.run(Probe::boxed("first", &log)).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "first.enter from nothing",
            "first.key n",
            "first.exit to Probe",
            "second.enter from Probe",
            "second.key z",
            "second.exit to nothing",
        ]
    );
}

#[test]
fn fault_restores_console_and_reports() {
    let log = Log::default();
    let (mut program, sink) = program(script(&[b"!", b"never"]));

    let err = program.run(Probe::boxed("first", &log)).unwrap_err();
    assert!(matches!(err, Error::Fault(ref m) if m == "probe refused"));

    let out = sink.contents();
    let restored = out.rfind("\x1b[?25h").unwrap();
    assert!(out[restored..].contains("error: probe refused\r\n"));
    assert!(out.contains("\x1b[18;1H"));
    assert_eq!(*log.borrow(), vec!["first.enter from nothing", "first.key !"]);
}

#[test]
fn kill_key_from_config_is_respected() {
    let sink = SharedBuffer::new();
    let config = ProgramConfig::new(40, 15, None, Key::Ctrl('q'));
    let input = script(&[b"a", b"\x11", b"b"]);
    let decoder = KeyDecoder::new(KeyTable::vt100(), input);
    let mut program = Program::new(&config, Output::new(sink), decoder);

    let log = Log::default();
    program.run(Probe::boxed("only", &log)).unwrap();
    assert!(!program.context().is_running());
    // the kill key itself is swallowed, the rest of the batch still arrives
    assert_eq!(
        *log.borrow(),
        vec!["only.enter from nothing", "only.key a", "only.key b", "only.exit to nothing"]
    );
}
