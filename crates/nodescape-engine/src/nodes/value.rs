//! Value node kinds.
//!
//! None of these take part in execution order. They run when a consumer
//! first needs one of their outputs during a pass.

use nodescape_core::metadata::{NodeMetadataBuilder, ProcessKind, SlotSide};
use nodescape_core::types::{Value, ValueType};

use crate::error::ProcessError;
use crate::kind::{NodeKind, ProcessContext};

/// Outputs a fixed value.
#[derive(Debug, Clone)]
pub struct Constant {
    pub value: Value,
}

impl Constant {
    pub fn new(value: Value) -> Self {
        Constant { value }
    }
}

impl NodeKind for Constant {
    fn type_name(&self) -> &'static str {
        "Constant"
    }

    fn metadata_key(&self) -> String {
        format!("Constant<{}>", self.value.value_type())
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        let ty = self.value.value_type();
        builder
            .generic_arg(ty)
            .process(ProcessKind::Sync)
            .output("Value", ty)
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        ctx.set_output(0, self.value.clone());
        Ok(None)
    }
}

/// Outputs the current value of a graph variable, or `Null` if it was
/// never written.
#[derive(Debug, Clone)]
pub struct ReadVariable {
    pub name: String,
}

impl ReadVariable {
    pub fn new(name: impl Into<String>) -> Self {
        ReadVariable { name: name.into() }
    }
}

impl NodeKind for ReadVariable {
    fn type_name(&self) -> &'static str {
        "ReadVariable"
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        builder.process(ProcessKind::Sync).output("Value", ValueType::Any)
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        let value = ctx.read_variable(&self.name).cloned().unwrap_or_default();
        ctx.set_output(0, value);
        Ok(None)
    }
}

/// Compares two values. Numbers compare by value across numeric types.
#[derive(Debug, Clone, Copy, Default)]
pub struct Equals;

impl NodeKind for Equals {
    fn type_name(&self) -> &'static str {
        "Equals"
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        builder
            .process(ProcessKind::Sync)
            .input("A", ValueType::Any)
            .input("B", ValueType::Any)
            .output("Result", ValueType::Bool)
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        let equal = values_equal(ctx.input(0), ctx.input(1));
        ctx.set_output(0, Value::Bool(equal));
        Ok(None)
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    if a.value_type().is_numeric() && b.value_type().is_numeric() {
        if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
            return x == y;
        }
        return a.as_f64() == b.as_f64();
    }
    a == b
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Not;

impl NodeKind for Not {
    fn type_name(&self) -> &'static str {
        "Not"
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        builder
            .process(ProcessKind::Sync)
            .input("Value", ValueType::Bool)
            .output("Result", ValueType::Bool)
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        let value = ctx.input(0).as_bool().unwrap_or(false);
        ctx.set_output(0, Value::Bool(!value));
        Ok(None)
    }
}

/// Adds two numbers or concatenates two texts.
///
/// Integers add as `Int` when both sides are `Int` and as `Long` otherwise;
/// any floating-point side makes the result a `Double`. Other combinations
/// have no overload.
///
/// The default instance takes `Any` on both sides and outputs `Any`, so its
/// result only feeds `Any` and `Text` inputs. [`Add::typed`] fixes the
/// operand type and declares the matching result type, which lets the sum
/// drive numeric inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Add {
    pub operand: Option<ValueType>,
}

impl Add {
    pub fn typed(operand: ValueType) -> Self {
        Add {
            operand: Some(operand),
        }
    }

    /// The declared result of adding two `operand` values. Types without an
    /// overload report `Any`.
    pub fn result_type(operand: ValueType) -> ValueType {
        match operand {
            ValueType::Int => ValueType::Int,
            ValueType::Byte | ValueType::Long => ValueType::Long,
            ValueType::Float | ValueType::Double => ValueType::Double,
            ValueType::Text => ValueType::Text,
            _ => ValueType::Any,
        }
    }
}

impl NodeKind for Add {
    fn type_name(&self) -> &'static str {
        "Add"
    }

    fn metadata_key(&self) -> String {
        match self.operand {
            Some(ty) => format!("Add<{ty}>"),
            None => "Add".to_string(),
        }
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        let builder = builder.process(ProcessKind::Sync);
        match self.operand {
            Some(ty) => builder
                .generic_arg(ty)
                .input("A", ty)
                .input("B", ty)
                .output("Result", Add::result_type(ty)),
            None => builder
                .input("A", ValueType::Any)
                .input("B", ValueType::Any)
                .output("Result", ValueType::Any),
        }
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        let result = match (ctx.input(0), ctx.input(1)) {
            (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(*b)),
            (Value::Text(a), Value::Text(b)) => Value::Text(format!("{a}{b}")),
            (a, b) => match (a.as_i64(), b.as_i64(), a.as_f64(), b.as_f64()) {
                (Some(x), Some(y), _, _) => Value::Long(x.wrapping_add(y)),
                (_, _, Some(x), Some(y)) => Value::Double(x + y),
                _ => {
                    return Err(ProcessError::no_overload(format!(
                        "add {} and {}",
                        a.value_type(),
                        b.value_type()
                    )))
                }
            },
        };
        ctx.set_output(0, result);
        Ok(None)
    }
}

/// Sums a variable number of integers.
#[derive(Debug, Clone, Copy)]
pub struct Sum {
    terms: usize,
}

impl Sum {
    pub fn new(terms: usize) -> Self {
        Sum { terms }
    }
}

impl Default for Sum {
    fn default() -> Self {
        Sum::new(2)
    }
}

impl NodeKind for Sum {
    fn type_name(&self) -> &'static str {
        "Sum"
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        builder
            .process(ProcessKind::Sync)
            .variable_input("Terms", ValueType::Int)
            .output("Total", ValueType::Long)
    }

    fn initial_variable_size(&self, _side: SlotSide) -> usize {
        self.terms
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        let total = ctx
            .variable_input()
            .iter()
            .filter_map(Value::as_i64)
            .fold(0i64, i64::wrapping_add);
        ctx.set_output(0, Value::Long(total));
        Ok(None)
    }
}

/// Joins a variable number of texts with a separator.
#[derive(Debug, Clone, Copy)]
pub struct JoinText {
    parts: usize,
}

impl JoinText {
    pub fn new(parts: usize) -> Self {
        JoinText { parts }
    }
}

impl Default for JoinText {
    fn default() -> Self {
        JoinText::new(2)
    }
}

impl NodeKind for JoinText {
    fn type_name(&self) -> &'static str {
        "JoinText"
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        builder
            .process(ProcessKind::Sync)
            .input("Separator", ValueType::Text)
            .variable_input("Parts", ValueType::Text)
            .output("Text", ValueType::Text)
    }

    fn initial_variable_size(&self, _side: SlotSide) -> usize {
        self.parts
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        let separator = ctx.input(0).to_text();
        let joined = ctx
            .variable_input()
            .iter()
            .map(Value::to_text)
            .collect::<Vec<_>>()
            .join(&separator);
        ctx.set_output(0, Value::Text(joined));
        Ok(None)
    }
}

/// Splits a text into a fixed number of parts.
///
/// An empty separator splits on whitespace. Missing parts are empty; the
/// last part keeps any remainder.
#[derive(Debug, Clone, Copy)]
pub struct SplitText {
    parts: usize,
}

impl SplitText {
    pub fn new(parts: usize) -> Self {
        SplitText { parts }
    }
}

impl Default for SplitText {
    fn default() -> Self {
        SplitText::new(2)
    }
}

impl NodeKind for SplitText {
    fn type_name(&self) -> &'static str {
        "SplitText"
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        builder
            .process(ProcessKind::Sync)
            .input("Text", ValueType::Text)
            .input("Separator", ValueType::Text)
            .output("Count", ValueType::Int)
            .variable_output("Parts", ValueType::Text)
    }

    fn initial_variable_size(&self, _side: SlotSide) -> usize {
        self.parts
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        let text = ctx.input(0).to_text();
        let separator = ctx.input(1).to_text();
        let slots = ctx.output_count().saturating_sub(1);

        let parts: Vec<String> = if separator.is_empty() {
            split_whitespace_n(&text, slots)
        } else {
            text.splitn(slots.max(1), separator.as_str()).map(str::to_string).collect()
        };

        ctx.set_output(0, Value::Int(i32::try_from(parts.len()).unwrap_or(i32::MAX)));
        ctx.set_variable_outputs(parts.into_iter().map(Value::Text));
        Ok(None)
    }
}

fn split_whitespace_n(text: &str, n: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() && parts.len() + 1 < n {
        match rest.find(char::is_whitespace) {
            Some(end) => {
                parts.push(rest[..end].to_string());
                rest = rest[end..].trim_start();
            }
            None => {
                parts.push(rest.to_string());
                rest = "";
            }
        }
    }
    if !rest.is_empty() {
        parts.push(rest.to_string());
    }
    parts
}
