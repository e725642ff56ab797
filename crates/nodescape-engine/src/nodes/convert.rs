//! Conversion node kinds.
//!
//! [`NodeScape::create_value_connection`](crate::NodeScape::create_value_connection)
//! inserts these between slots whose types differ but are convertible. They
//! can also be placed by hand.

use nodescape_core::metadata::{NodeMetadataBuilder, ProcessKind};
use nodescape_core::types::{Value, ValueType};

use crate::coercion;
use crate::error::ProcessError;
use crate::kind::{NodeKind, ProcessContext};

/// Widens a numeric value from one type to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cast {
    pub from: ValueType,
    pub to: ValueType,
}

impl Cast {
    pub fn new(from: ValueType, to: ValueType) -> Self {
        Cast { from, to }
    }
}

impl NodeKind for Cast {
    fn type_name(&self) -> &'static str {
        "Cast"
    }

    fn metadata_key(&self) -> String {
        format!("Cast<{},{}>", self.from, self.to)
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        builder
            .generic_arg(self.from)
            .generic_arg(self.to)
            .process(ProcessKind::Sync)
            .input("Value", self.from)
            .output("Value", self.to)
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        let input = ctx.input(0);
        let cast = coercion::cast_value(input, self.to).ok_or_else(|| {
            ProcessError::no_overload(format!("cast {} to {}", input.value_type(), self.to))
        })?;
        ctx.set_output(0, cast);
        Ok(None)
    }
}

/// Converts any value to its display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToText {
    pub from: ValueType,
}

impl ToText {
    pub fn new(from: ValueType) -> Self {
        ToText { from }
    }
}

impl NodeKind for ToText {
    fn type_name(&self) -> &'static str {
        "ToText"
    }

    fn metadata_key(&self) -> String {
        format!("ToText<{}>", self.from)
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        builder
            .generic_arg(self.from)
            .process(ProcessKind::Sync)
            .input("Value", self.from)
            .output("Text", ValueType::Text)
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        let text = ctx.input(0).to_text();
        ctx.set_output(0, Value::Text(text));
        Ok(None)
    }
}
