use crate::time::SimTime;
use std::fmt::Display;

///
/// A stopping bound for the firing loop, checked before every pop.
///
/// A tripped limit ends the run the same way a statistic stop rule does:
/// the end-of-simulation flag is raised and the pending event stays queued.
/// Bounds compose via [`RunLimit::add`], so a simulation can cap both the
/// event count and the simulated time and stop at whichever trips first.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunLimit {
    /// No bound. The run lasts until the event list drains or the
    /// monitored statistics end it.
    None,

    /// Caps the number of fired events. The bound-th event still fires,
    /// anything beyond it does not.
    EventCount(usize),

    /// Caps the simulated time. Events scheduled exactly at the bound
    /// still fire, later ones do not.
    SimTime(SimTime),

    /// Trips only once both inner bounds have tripped.
    CombinedAnd(Box<RunLimit>, Box<RunLimit>),

    /// Trips as soon as either inner bound trips.
    CombinedOr(Box<RunLimit>, Box<RunLimit>),
}

impl RunLimit {
    pub(crate) fn applies(&self, event_count: usize, time: SimTime) -> bool {
        match self {
            Self::None => false,

            Self::EventCount(e) => event_count > *e,
            Self::SimTime(t) => time > *t,

            Self::CombinedAnd(lhs, rhs) => {
                lhs.applies(event_count, time) && rhs.applies(event_count, time)
            }
            Self::CombinedOr(lhs, rhs) => {
                lhs.applies(event_count, time) || rhs.applies(event_count, time)
            }
        }
    }

    /// Merges another bound into this one. A `None` limit is replaced,
    /// anything else is combined with a logical OR.
    pub fn add(&mut self, other: RunLimit) {
        if matches!(self, Self::None) {
            *self = other;
        } else {
            let lhs = std::mem::replace(self, Self::None);
            *self = Self::CombinedOr(Box::new(lhs), Box::new(other));
        }
    }
}

impl Display for RunLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "unbounded"),

            Self::EventCount(e) => write!(f, "at most {e} events"),
            Self::SimTime(t) => write!(f, "up to t = {t}"),

            Self::CombinedAnd(lhs, rhs) => write!(f, "({lhs}) and ({rhs})"),
            Self::CombinedOr(lhs, rhs) => write!(f, "({lhs}) or ({rhs})"),
        }
    }
}
