//! Flow node kinds.

use nodescape_core::metadata::{NodeMetadataBuilder, ProcessKind};
use nodescape_core::types::{Value, ValueType};

use crate::error::ProcessError;
use crate::kind::{NodeKind, ProcessContext};

/// Entry point that fires on every evaluation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateTrigger;

impl NodeKind for UpdateTrigger {
    fn type_name(&self) -> &'static str {
        "UpdateTrigger"
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        builder.trigger().flow_outputs(["Out"]).process(ProcessKind::Sync)
    }

    fn process(&mut self, _ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        Ok(None)
    }
}

/// Entry point that fires on the first evaluation pass only.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnceTrigger {
    fired: bool,
}

impl NodeKind for OnceTrigger {
    fn type_name(&self) -> &'static str {
        "OnceTrigger"
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        builder
            .trigger()
            .flow_outputs(["Out"])
            .returns_flow()
            .process(ProcessKind::Sync)
    }

    fn process(&mut self, _ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        if self.fired {
            return Ok(None);
        }
        self.fired = true;
        Ok(Some(0))
    }
}

/// Continues on `True` or `False` depending on its condition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Branch;

impl NodeKind for Branch {
    fn type_name(&self) -> &'static str {
        "Branch"
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        builder
            .flow_input()
            .flow_outputs(["True", "False"])
            .returns_flow()
            .process(ProcessKind::Sync)
            .input("Condition", ValueType::Bool)
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        let condition = ctx
            .input(0)
            .as_bool()
            .ok_or_else(|| ProcessError::no_overload(format!("branch on {}", ctx.input(0).value_type())))?;
        Ok(Some(if condition { 0 } else { 1 }))
    }
}

/// Runs its `First` thread in its own scope, then continues on `Then`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequence;

impl NodeKind for Sequence {
    fn type_name(&self) -> &'static str {
        "Sequence"
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        builder
            .flow_input()
            .flow_outputs(["First", "Then"])
            .returns_flow()
            .process(ProcessKind::Sync)
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        ctx.trigger_flow(0, true);
        Ok(Some(1))
    }
}

/// Runs its `Loop` thread `Count` times, each iteration in a fresh scope,
/// then continues on `Done`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Repeat;

impl NodeKind for Repeat {
    fn type_name(&self) -> &'static str {
        "Repeat"
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        builder
            .flow_input()
            .flow_outputs(["Loop", "Done"])
            .returns_flow()
            .process(ProcessKind::Sync)
            .input("Count", ValueType::Int)
            .output("Index", ValueType::Int)
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        let count = ctx.input(0).as_i64().unwrap_or(0).max(0);
        for index in 0..count {
            // Count is an Int input, so the index always fits.
            ctx.set_output(0, Value::Int(index as i32));
            ctx.trigger_flow(0, true);
        }
        Ok(Some(1))
    }
}

/// Emits its text as a line of output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Print;

impl NodeKind for Print {
    fn type_name(&self) -> &'static str {
        "Print"
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        builder
            .flow_input()
            .flow_outputs(["Out"])
            .process(ProcessKind::Sync)
            .input("Text", ValueType::Text)
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        let text = ctx.input(0).to_text();
        ctx.print(text);
        Ok(None)
    }
}

/// Stores its input in a graph variable.
#[derive(Debug, Clone)]
pub struct WriteVariable {
    pub name: String,
    /// Persistent writes are also handed to the host.
    pub persistent: bool,
}

impl WriteVariable {
    pub fn new(name: impl Into<String>, persistent: bool) -> Self {
        WriteVariable {
            name: name.into(),
            persistent,
        }
    }
}

impl NodeKind for WriteVariable {
    fn type_name(&self) -> &'static str {
        "WriteVariable"
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        builder
            .flow_input()
            .flow_outputs(["Out"])
            .process(ProcessKind::Sync)
            .input("Value", ValueType::Any)
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        let value = ctx.input(0).clone();
        ctx.write_variable(self.name.clone(), value, self.persistent);
        Ok(None)
    }
}
