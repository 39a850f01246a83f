//! Internal transaction tracing.
//!
//! Records the tree of nested calls and creations the way geth's
//! `callTracer` reports them. Tracing is metadata only: it never affects
//! gas accounting or the state delta.

use crate::{
    errors::{ContextResult, InternalError, TxResult, VMError},
    opcodes::Opcode,
};
use bytes::Bytes;
use ethereum_types::{Address, U256};
use serde::Serialize;

fn u64_to_hex<S>(x: &u64, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_str(&format!("0x{x:x}"))
}

fn u256_to_hex<S>(x: &U256, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_str(&format!("0x{x:x}"))
}

fn bytes_to_hex<S>(x: &Bytes, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let mut hex = String::with_capacity(2 + x.len() * 2);
    hex.push_str("0x");
    for byte in x.iter() {
        hex.push_str(&format!("{byte:02x}"));
    }
    s.serialize_str(&hex)
}

fn option_string_empty_as_str<S>(x: &Option<String>, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_str(x.as_deref().unwrap_or(""))
}

/// One call in the trace tree.
#[derive(Debug, Clone, Serialize)]
pub struct TraceFrame {
    #[serde(rename = "type")]
    pub call_type: Opcode,
    pub from: Address,
    pub to: Address,
    #[serde(serialize_with = "u256_to_hex")]
    pub value: U256,
    #[serde(serialize_with = "u64_to_hex")]
    pub gas: u64,
    #[serde(rename = "gasUsed", serialize_with = "u64_to_hex")]
    pub gas_used: u64,
    #[serde(serialize_with = "bytes_to_hex")]
    pub input: Bytes,
    #[serde(serialize_with = "bytes_to_hex")]
    pub output: Bytes,
    #[serde(serialize_with = "option_string_empty_as_str")]
    pub error: Option<String>,
    pub calls: Vec<TraceFrame>,
}

impl TraceFrame {
    pub fn new(
        call_type: Opcode,
        from: Address,
        to: Address,
        value: U256,
        gas: u64,
        input: Bytes,
    ) -> Self {
        Self {
            call_type,
            from,
            to,
            value,
            gas,
            gas_used: 0,
            input,
            output: Bytes::new(),
            error: None,
            calls: Vec::new(),
        }
    }
}

/// Collects the call tree during execution. Use [`CallTracer::disabled`]
/// when tracing is not wanted; every hook is then a no-op.
#[derive(Debug, Default)]
pub struct CallTracer {
    /// Stack of open frames; at the end of execution exactly one remains.
    pub callframes: Vec<TraceFrame>,
    pub active: bool,
}

impl CallTracer {
    pub fn new() -> Self {
        Self {
            callframes: vec![],
            active: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            active: false,
            ..Default::default()
        }
    }

    /// Open a frame for a call or creation that is about to run.
    pub fn enter(
        &mut self,
        call_type: Opcode,
        from: Address,
        to: Address,
        value: U256,
        gas: u64,
        input: Bytes,
    ) {
        if !self.active {
            return;
        }
        self.callframes
            .push(TraceFrame::new(call_type, from, to, value, gas, input));
    }

    /// Close the current frame with the result the frame produced.
    pub fn exit_context(&mut self, ctx_result: &ContextResult) -> Result<(), VMError> {
        if !self.active {
            return Ok(());
        }

        let error = match &ctx_result.result {
            TxResult::Success => None,
            TxResult::Revert(err) => Some(err.to_string()),
        };
        self.exit(ctx_result.gas_used, ctx_result.output.clone(), error)
    }

    /// Close the current frame early, before any subframe ran (pre-flight
    /// rejections and SELFDESTRUCT records).
    pub fn exit_early(&mut self, gas_used: u64, error: Option<String>) -> Result<(), VMError> {
        if !self.active {
            return Ok(());
        }
        self.exit(gas_used, Bytes::new(), error)
    }

    fn exit(&mut self, gas_used: u64, output: Bytes, error: Option<String>) -> Result<(), VMError> {
        let mut closed = self
            .callframes
            .pop()
            .ok_or(InternalError::CouldNotPopCallframe)?;
        closed.gas_used = gas_used;
        closed.output = output;
        closed.error = error;

        match self.callframes.last_mut() {
            Some(parent) => parent.calls.push(closed),
            None => self.callframes.push(closed),
        }
        Ok(())
    }

    /// The finished trace tree, if tracing was active and execution
    /// completed.
    pub fn into_root(mut self) -> Option<TraceFrame> {
        self.callframes.pop()
    }
}
