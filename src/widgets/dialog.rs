//! Form dialog: typed fields bound to an operation.
//!
//! Structure:
//! - `Value`: converted field value handed to the operation
//! - `Field`: one typed input, free text or a fixed choice list
//! - `Dialog`: the screen; submits when every field converts
//!
//! Free-text fields only ever hold text that validates or is an
//! incomplete prefix of something that could (`-` for numbers, `ye` for
//! booleans). Edits that would break that are reverted.

use std::fmt;

use crate::ansi::Escape;
use crate::error::Result;
use crate::keys::Key;
use crate::program::{Context, Screen, ScreenBox};
use crate::span::Span;

use super::{Message, default_decorator, draw_header, first_row};

// ============================================================================
// VALUES
// ============================================================================

/// A field converted to its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

// ============================================================================
// FIELDS
// ============================================================================

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
    Bool,
    Text,
}

const BOOL_WORDS: [(&str, bool); 4] = [("true", true), ("false", false), ("yes", true), ("no", false)];

impl FieldKind {
    /// Convert raw text, `None` when it does not parse.
    pub fn parse(self, raw: &str) -> Option<Value> {
        match self {
            FieldKind::Int => raw.parse().ok().map(Value::Int),
            FieldKind::Float => raw.parse().ok().map(Value::Float),
            FieldKind::Bool => {
                let lower = raw.to_lowercase();
                BOOL_WORDS
                    .iter()
                    .find(|(word, _)| *word == lower)
                    .map(|(_, b)| Value::Bool(*b))
            }
            FieldKind::Text => Some(Value::Text(raw.to_string())),
        }
    }

    /// Whether `raw` is an unfinished entry that more typing could complete.
    fn is_partial(self, raw: &str) -> bool {
        match self {
            FieldKind::Int => matches!(raw, "-" | "+"),
            FieldKind::Float => matches!(raw, "-" | "+" | "." | "-." | "+."),
            FieldKind::Bool => {
                let lower = raw.to_lowercase();
                !lower.is_empty() && BOOL_WORDS.iter().any(|(word, _)| word.starts_with(&lower))
            }
            FieldKind::Text => false,
        }
    }
}

type Validator = Box<dyn Fn(&Value) -> bool>;
type Obfuscator = Box<dyn Fn(&str) -> String>;

/// One typed input of a [`Dialog`].
pub struct Field {
    name: String,
    kind: FieldKind,
    choices: Vec<String>,
    index: usize,
    text: String,
    validator: Validator,
    obfuscator: Option<Obfuscator>,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Field {
            name: name.into(),
            kind,
            choices: Vec::new(),
            index: 0,
            text: String::new(),
            validator: Box::new(|_| true),
            obfuscator: None,
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    /// Yes/No choice, the default contents of a confirmation dialog.
    pub fn confirm(name: impl Into<String>) -> Self {
        Self::bool(name).choices(["Yes", "No"])
    }

    /// Restrict the field to a fixed list of labels. Each label converts
    /// according to the declared kind.
    pub fn choices<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = labels.into_iter().map(Into::into).collect();
        self.index = 0;
        self
    }

    /// Preselect a choice; out-of-range indices clamp to the last label.
    pub fn selected(mut self, index: usize) -> Self {
        self.index = index.min(self.choices.len().saturating_sub(1));
        self
    }

    /// Initial free text.
    pub fn value(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn validate(mut self, validator: impl Fn(&Value) -> bool + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Display transform for the free text, e.g. [`masked`] for PINs.
    pub fn obfuscate(mut self, obfuscator: impl Fn(&str) -> String + 'static) -> Self {
        self.obfuscator = Some(Box::new(obfuscator));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_choice(&self) -> bool {
        !self.choices.is_empty()
    }

    /// Raw free text, or the selected label of a choice field.
    pub fn raw(&self) -> &str {
        if self.is_choice() {
            self.choices.get(self.index).map(String::as_str).unwrap_or("")
        } else {
            &self.text
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_valid(&self) -> bool {
        self.convert().is_some()
    }

    /// The typed value, `None` while the field does not validate.
    pub fn convert(&self) -> Option<Value> {
        if self.is_choice() && self.index >= self.choices.len() {
            return None;
        }
        let value = self.kind.parse(self.raw())?;
        (self.validator)(&value).then_some(value)
    }

    /// Append `c` to free text; reverted unless the result is valid or
    /// still a prefix of something valid. Returns whether it stuck.
    pub fn push(&mut self, c: char) -> bool {
        if self.is_choice() {
            return false;
        }
        self.text.push(c);
        if self.is_valid() || self.kind.is_partial(&self.text) {
            true
        } else {
            self.text.pop();
            false
        }
    }

    /// Remove the last character of free text.
    pub fn pop(&mut self) -> bool {
        !self.is_choice() && self.text.pop().is_some()
    }

    pub fn previous_choice(&mut self) {
        if self.is_choice() {
            self.index = self.index.saturating_sub(1);
        }
    }

    pub fn next_choice(&mut self) {
        if self.index + 1 < self.choices.len() {
            self.index += 1;
        }
    }

    /// The value part of the rendered row. Choices show arrows only where
    /// there is somewhere to move.
    pub fn display(&self) -> String {
        if self.is_choice() {
            let left = if self.index > 0 { "< " } else { "" };
            let right = if self.index + 1 < self.choices.len() { " >" } else { "" };
            format!("{left}{}{right}", self.raw())
        } else {
            match &self.obfuscator {
                Some(obfuscate) => obfuscate(&self.text),
                None => self.text.clone(),
            }
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("choices", &self.choices)
            .field("index", &self.index)
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

/// PIN-style display: one `*` per typed character, `_` for the rest of
/// `width`, space separated. `masked("12", 4)` is `"* * _ _"`.
pub fn masked(value: &str, width: usize) -> String {
    let typed = value.chars().count();
    let cells: Vec<&str> = (0..typed.max(width)).map(|i| if i < typed { "*" } else { "_" }).collect();
    cells.join(" ")
}

// ============================================================================
// DIALOG
// ============================================================================

/// Called with the converted fields, in declared order. Its result is
/// shown in a [`Message`].
pub type Operation = Box<dyn FnMut(&[Value]) -> Span>;

/// Where the result message continues when dismissed.
#[derive(Default)]
pub enum Destination {
    /// The screen the dialog was opened from.
    #[default]
    Previous,
    Screen(ScreenBox),
    /// Nowhere: the message stays until the kill key.
    Stay,
}

pub struct Dialog {
    operation: Operation,
    header: Span,
    fields: Vec<Field>,
    focused: usize,
    destination: Destination,
    previous: Option<ScreenBox>,
    decorator: Vec<Escape>,
}

impl Dialog {
    pub fn new(
        header: impl Into<Span>,
        fields: Vec<Field>,
        operation: impl FnMut(&[Value]) -> Span + 'static,
    ) -> Self {
        Dialog {
            operation: Box::new(operation),
            header: header.into(),
            fields,
            focused: 0,
            destination: Destination::default(),
            previous: None,
            decorator: default_decorator(),
        }
    }

    /// Single Yes/No question.
    pub fn confirm(header: impl Into<Span>, operation: impl FnMut(&[Value]) -> Span + 'static) -> Self {
        Self::new(header, vec![Field::confirm("Continue?")], operation)
    }

    pub fn then(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn decorator(mut self, decorator: Vec<Escape>) -> Self {
        self.decorator = decorator;
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn focused(&self) -> usize {
        self.focused
    }

    /// Run the operation if every field converts. Returns whether it ran.
    fn submit(&mut self, ctx: &mut Context) -> bool {
        let Some(values) = self.fields.iter().map(Field::convert).collect::<Option<Vec<_>>>() else {
            return false;
        };
        let result = (self.operation)(&values);
        let next = match std::mem::take(&mut self.destination) {
            Destination::Previous => self.previous.take(),
            Destination::Screen(screen) => Some(screen),
            Destination::Stay => None,
        };
        tracing::debug!(fields = values.len(), "dialog submitted");
        ctx.switch_to(Box::new(Message::new(result).with_next(next)));
        true
    }

    fn draw_fields(&self, ctx: &mut Context) {
        let top = first_row(&self.header);
        for (i, field) in self.fields.iter().enumerate() {
            let name = if i == self.focused {
                Span::styled(field.name(), &self.decorator)
            } else {
                Span::from(field.name())
            };
            let line = name.text(": ").text(field.display());
            ctx.print_line(top + i as u16, &line);
        }
    }
}

impl Screen for Dialog {
    fn enter(&mut self, ctx: &mut Context, previous: Option<ScreenBox>) -> Result<()> {
        self.previous = previous;
        ctx.clear()?;
        draw_header(ctx, &self.header);
        self.draw_fields(ctx);
        Ok(())
    }

    fn keypress(&mut self, ctx: &mut Context, key: Key) -> Result<()> {
        if key == ctx.back_key() {
            if let Some(previous) = self.previous.take() {
                ctx.switch_to(previous);
                return Ok(());
            }
        }

        match key {
            Key::Up => self.focused = self.focused.saturating_sub(1),
            Key::Down => {
                if self.focused + 1 < self.fields.len() {
                    self.focused += 1;
                }
            }
            Key::Enter => {
                if self.submit(ctx) {
                    return Ok(());
                }
            }
            edit => {
                if let Some(field) = self.fields.get_mut(self.focused) {
                    match edit {
                        Key::Left => field.previous_choice(),
                        Key::Right => field.next_choice(),
                        Key::Backspace => {
                            field.pop();
                        }
                        other => {
                            if let Some(c) = other.as_char() {
                                field.push(c);
                            }
                        }
                    }
                }
            }
        }
        self.draw_fields(ctx);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::widgets::testing;

    fn pin() -> Field {
        Field::int("PIN")
            .validate(|v| v.as_int().is_some_and(|p| p < 10_000))
            .obfuscate(|p| masked(p, 4))
    }

    fn type_into(field: &mut Field, text: &str) {
        for c in text.chars() {
            field.push(c);
        }
    }

    #[test]
    fn int_field_rejects_digits_that_break_the_validator() {
        let mut field = pin();
        type_into(&mut field, "123");
        assert_eq!(field.raw(), "123");
        assert!(field.push('4'));
        assert_eq!(field.raw(), "1234");
        assert!(!field.push('5'));
        assert_eq!(field.raw(), "1234");
        assert_eq!(field.convert(), Some(Value::Int(1234)));
    }

    #[test]
    fn int_field_rejects_letters_and_allows_a_sign() {
        let mut field = Field::int("n");
        assert!(!field.push('x'));
        assert!(field.push('-'));
        assert!(field.convert().is_none());
        assert!(field.push('7'));
        assert_eq!(field.convert(), Some(Value::Int(-7)));
    }

    #[test]
    fn bool_field_accepts_words_while_typing() {
        let mut field = Field::bool("sure");
        type_into(&mut field, "yes");
        assert_eq!(field.raw(), "yes");
        assert_eq!(field.convert(), Some(Value::Bool(true)));

        let mut field = Field::bool("sure");
        type_into(&mut field, "no");
        assert_eq!(field.convert(), Some(Value::Bool(false)));

        let mut field = Field::bool("sure");
        type_into(&mut field, "TrUe");
        assert_eq!(field.convert(), Some(Value::Bool(true)));
        assert!(!field.push('!'));
    }

    #[test]
    fn bool_field_rejects_non_words() {
        let mut field = Field::bool("sure");
        assert!(!field.push('x'));
        assert!(field.push('y'));
        assert!(!field.push('o'));
        assert_eq!(field.raw(), "y");
        assert!(field.convert().is_none());
    }

    #[test]
    fn float_field_parses_decimals() {
        let mut field = Field::float("amount");
        type_into(&mut field, "-.5");
        assert_eq!(field.convert(), Some(Value::Float(-0.5)));
        assert!(!field.push('.'));
    }

    #[test]
    fn text_field_passes_raw_text_to_validator() {
        let mut field = Field::text("name").validate(|v| v.as_text().is_some_and(|s| s.len() <= 3));
        type_into(&mut field, "abcd");
        assert_eq!(field.raw(), "abc");
        assert!(field.pop());
        assert_eq!(field.raw(), "ab");
    }

    #[test]
    fn empty_text_field_is_valid_but_empty_number_is_not() {
        assert!(Field::text("name").is_valid());
        assert!(!Field::int("n").is_valid());
        assert!(!Field::float("x").is_valid());
        assert!(!Field::bool("b").is_valid());
    }

    #[test]
    fn choice_fields_move_within_bounds() {
        let mut field = Field::int("level").choices(["1", "2", "3"]);
        assert_eq!(field.display(), "1 >");
        field.previous_choice();
        assert_eq!(field.index(), 0);
        field.next_choice();
        assert_eq!(field.display(), "< 2 >");
        field.next_choice();
        field.next_choice();
        assert_eq!(field.display(), "< 3");
        assert_eq!(field.convert(), Some(Value::Int(3)));
        assert!(!field.push('4'));
        assert!(!field.pop());
    }

    #[test]
    fn confirm_choice_converts_labels() {
        let field = Field::confirm("Continue?");
        assert_eq!(field.convert(), Some(Value::Bool(true)));
        let field = Field::confirm("Continue?").selected(1);
        assert_eq!(field.convert(), Some(Value::Bool(false)));
    }

    #[test]
    fn masked_pads_to_width() {
        assert_eq!(masked("", 4), "_ _ _ _");
        assert_eq!(masked("12", 4), "* * _ _");
        assert_eq!(masked("123456", 4), "* * * * * *");
    }

    type Calls = Rc<RefCell<Vec<Vec<Value>>>>;

    fn recording(fields: Vec<Field>) -> (Dialog, Calls) {
        let calls = Calls::default();
        let log = Rc::clone(&calls);
        let dialog = Dialog::new("Form", fields, move |values| {
            log.borrow_mut().push(values.to_vec());
            Span::from("OK")
        });
        (dialog, calls)
    }

    fn press(dialog: &mut Dialog, ctx: &mut Context, keys: &[Key]) {
        for key in keys {
            dialog.keypress(ctx, *key).unwrap();
        }
    }

    #[test]
    fn invalid_dialog_never_submits() {
        let (mut ctx, _sink) = testing::context();
        let (mut dialog, calls) = recording(vec![Field::text("name"), Field::int("age")]);
        dialog.enter(&mut ctx, None).unwrap();

        press(&mut dialog, &mut ctx, &[Key::Char('a'), Key::Enter]);
        assert!(calls.borrow().is_empty());
        assert!(ctx.take_transition().is_none());
    }

    #[test]
    fn valid_dialog_submits_once_in_declared_order() {
        let (mut ctx, _sink) = testing::context();
        let (mut dialog, calls) = recording(vec![
            Field::text("name"),
            Field::int("age"),
            Field::confirm("ok"),
        ]);
        dialog.enter(&mut ctx, None).unwrap();

        press(&mut dialog, &mut ctx, &[Key::Char('B'), Key::Char('o'), Key::Down]);
        press(&mut dialog, &mut ctx, &[Key::Char('4'), Key::Char('2'), Key::Down, Key::Right]);
        press(&mut dialog, &mut ctx, &[Key::Enter]);

        assert_eq!(
            *calls.borrow(),
            vec![vec![Value::Text("Bo".into()), Value::Int(42), Value::Bool(false)]]
        );
        let message = ctx.take_transition().unwrap();
        assert!(message.name().ends_with("Message"));
        assert!(ctx.take_transition().is_none());
    }

    #[test]
    fn focus_clamps_and_space_types_a_space() {
        let (mut ctx, _sink) = testing::context();
        let (mut dialog, _calls) = recording(vec![Field::text("a"), Field::text("b")]);
        press(&mut dialog, &mut ctx, &[Key::Up, Key::Down, Key::Down]);
        assert_eq!(dialog.focused(), 1);
        press(&mut dialog, &mut ctx, &[Key::Char('x'), Key::Space, Key::Char('y'), Key::Tab]);
        assert_eq!(dialog.fields()[1].raw(), "x y");
    }

    #[test]
    fn back_key_returns_to_previous_screen() {
        let (mut ctx, _sink) = testing::context();
        let (mut dialog, calls) = recording(vec![Field::text("a")]);
        dialog.enter(&mut ctx, Some(Box::new(Message::new("origin")))).unwrap();

        press(&mut dialog, &mut ctx, &[Key::Char('q'), Key::Ctrl('z')]);
        let back = ctx.take_transition().unwrap();
        assert!(back.name().ends_with("Message"));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn back_key_without_previous_is_ignored() {
        let (mut ctx, _sink) = testing::context();
        let (mut dialog, _calls) = recording(vec![Field::text("a")]);
        dialog.enter(&mut ctx, None).unwrap();
        press(&mut dialog, &mut ctx, &[Key::Ctrl('z')]);
        assert!(ctx.take_transition().is_none());
    }

    #[test]
    fn rows_show_name_value_and_focus() {
        let (mut ctx, sink) = testing::context();
        let mut dialog = Dialog::new("Register", vec![Field::text("name"), pin()], |_| Span::from("OK"));
        dialog.enter(&mut ctx, None).unwrap();
        press(&mut dialog, &mut ctx, &[Key::Down, Key::Char('1')]);
        let out = testing::drain(&mut ctx, &sink);

        assert!(out.contains("Register"));
        assert!(out.contains("name: "));
        assert!(out.contains("\x1b[1m\x1b[33mPIN\x1b[0m: * _ _ _"));
    }
}
