//! Module-bound nodes.

use nodescape_core::metadata::{NodeMetadataBuilder, SlotSide};

use crate::error::ProcessError;
use crate::kind::{NodeKind, ProcessContext};

/// Wraps another node kind so it only runs while a host module is running.
///
/// The wrapper has the shape of the wrapped kind. While the module is
/// stopped the node does nothing: its outputs keep their defaults and its
/// outgoing flow stops.
#[derive(Debug)]
pub struct ModuleBound {
    pub module: String,
    inner: Box<dyn NodeKind>,
}

impl ModuleBound {
    pub fn new(module: impl Into<String>, inner: impl NodeKind + 'static) -> Self {
        Self::boxed(module, Box::new(inner))
    }

    pub fn boxed(module: impl Into<String>, inner: Box<dyn NodeKind>) -> Self {
        ModuleBound {
            module: module.into(),
            inner,
        }
    }

    pub fn inner(&self) -> &dyn NodeKind {
        self.inner.as_ref()
    }
}

impl NodeKind for ModuleBound {
    fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    fn metadata_key(&self) -> String {
        self.inner.metadata_key()
    }

    fn describe(&self, builder: NodeMetadataBuilder) -> NodeMetadataBuilder {
        self.inner.describe(builder)
    }

    fn initial_variable_size(&self, side: SlotSide) -> usize {
        self.inner.initial_variable_size(side)
    }

    fn process(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Option<usize>, ProcessError> {
        if !ctx.host().is_module_running(&self.module) {
            tracing::debug!(node = ctx.node().0, "module '{}' not running, skipping", self.module);
            ctx.halt_flow();
            return Ok(None);
        }
        self.inner.process(ctx)
    }
}
