//! Callbacks fired while a conversation loop runs.

use super::LoopState;
use crate::error::ApiError;
use crate::tools::ToolResult;
use crate::types::{ContentBlock, MessagesRequest, MessagesResponse};

/// Receives loop progress. Every method defaults to a no-op.
pub trait LoopObserver: Send {
    /// The loop entered `state`.
    fn on_state(&mut self, _state: LoopState) {}

    /// One request/response exchange with the upstream API finished.
    fn on_api_exchange(
        &mut self,
        _request: &MessagesRequest,
        _outcome: Result<&MessagesResponse, &ApiError>,
    ) {
    }

    /// One block of an assistant response, in order.
    fn on_block(&mut self, _block: &ContentBlock) {}

    /// A tool invocation finished.
    fn on_tool_result(&mut self, _tool_use_id: &str, _tool_name: &str, _result: &ToolResult) {}
}

impl LoopObserver for () {}

impl<T: LoopObserver + ?Sized> LoopObserver for &mut T {
    fn on_state(&mut self, state: LoopState) {
        (**self).on_state(state);
    }

    fn on_api_exchange(
        &mut self,
        request: &MessagesRequest,
        outcome: Result<&MessagesResponse, &ApiError>,
    ) {
        (**self).on_api_exchange(request, outcome);
    }

    fn on_block(&mut self, block: &ContentBlock) {
        (**self).on_block(block);
    }

    fn on_tool_result(&mut self, tool_use_id: &str, tool_name: &str, result: &ToolResult) {
        (**self).on_tool_result(tool_use_id, tool_name, result);
    }
}

/// Fan out to two observers, first then second.
impl<A: LoopObserver, B: LoopObserver> LoopObserver for (A, B) {
    fn on_state(&mut self, state: LoopState) {
        self.0.on_state(state);
        self.1.on_state(state);
    }

    fn on_api_exchange(
        &mut self,
        request: &MessagesRequest,
        outcome: Result<&MessagesResponse, &ApiError>,
    ) {
        self.0.on_api_exchange(request, outcome);
        self.1.on_api_exchange(request, outcome);
    }

    fn on_block(&mut self, block: &ContentBlock) {
        self.0.on_block(block);
        self.1.on_block(block);
    }

    fn on_tool_result(&mut self, tool_use_id: &str, tool_name: &str, result: &ToolResult) {
        self.0.on_tool_result(tool_use_id, tool_name, result);
        self.1.on_tool_result(tool_use_id, tool_name, result);
    }
}

impl<T: LoopObserver> LoopObserver for Option<T> {
    fn on_state(&mut self, state: LoopState) {
        if let Some(inner) = self {
            inner.on_state(state);
        }
    }

    fn on_api_exchange(
        &mut self,
        request: &MessagesRequest,
        outcome: Result<&MessagesResponse, &ApiError>,
    ) {
        if let Some(inner) = self {
            inner.on_api_exchange(request, outcome);
        }
    }

    fn on_block(&mut self, block: &ContentBlock) {
        if let Some(inner) = self {
            inner.on_block(block);
        }
    }

    fn on_tool_result(&mut self, tool_use_id: &str, tool_name: &str, result: &ToolResult) {
        if let Some(inner) = self {
            inner.on_tool_result(tool_use_id, tool_name, result);
        }
    }
}
