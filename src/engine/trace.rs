//! Call-chain correlation for follow-up rules.

use crate::lang::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceState {
    /// Bound to a variable that provably differs from the expected one.
    Different,
    /// No binding expected.
    NoSymbol,
    /// The matched site must be bound to this exact symbol.
    Symbol,
    /// First hop of a trace; never rejects.
    SymbolIgnored,
}

/// Decides whether a freshly matched site belongs to the same logical object
/// chain as the detection that spawned the rule being evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSymbol<'a> {
    symbol: Option<Symbol<'a>>,
    state: TraceState,
}

impl<'a> TraceSymbol<'a> {
    pub fn start() -> Self {
        Self {
            symbol: None,
            state: TraceState::SymbolIgnored,
        }
    }

    pub fn from_symbol(symbol: Symbol<'a>) -> Self {
        Self {
            symbol: Some(symbol),
            state: TraceState::Symbol,
        }
    }

    pub fn different() -> Self {
        Self {
            symbol: None,
            state: TraceState::Different,
        }
    }

    pub fn no_symbol() -> Self {
        Self {
            symbol: None,
            state: TraceState::NoSymbol,
        }
    }

    pub fn state(&self) -> TraceState {
        self.state
    }

    pub fn symbol(&self) -> Option<&Symbol<'a>> {
        self.symbol.as_ref()
    }

    pub fn is_different(&self) -> bool {
        self.state == TraceState::Different
    }

    /// `bound` is the variable the site operates on, `assigned` the variable
    /// its result is stored in, `chained` whether its receiver is a call.
    pub fn admits(
        &self,
        bound: Option<&Symbol<'a>>,
        assigned: Option<&Symbol<'a>>,
        chained: bool,
    ) -> bool {
        match self.state {
            TraceState::SymbolIgnored => true,
            TraceState::Different => false,
            TraceState::Symbol => bound.is_some() && bound == self.symbol.as_ref(),
            TraceState::NoSymbol => assigned.is_none() || chained,
        }
    }
}

impl Default for TraceSymbol<'_> {
    fn default() -> Self {
        Self::start()
    }
}
