//! Check states reported by the monitoring framework.

use core::fmt;
use core::str::FromStr;

/// Whether a state has been confirmed by the retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum StateType {
    /// Still in retry/confirmation.
    Soft,
    /// Confirmed, stable state.
    #[default]
    Hard,
}

impl StateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateType::Soft => "SOFT",
            StateType::Hard => "HARD",
        }
    }
}

/// Error returned when a state name is not part of a variant's vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownState(pub String);

impl fmt::Display for UnknownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown state: {}", self.0)
    }
}

impl std::error::Error for UnknownState {}

/// Current state of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum HostState {
    Up,
    Down,
    Unreachable,
    Unknown,
    #[default]
    Pending,
}

impl HostState {
    pub const ALL: [HostState; 5] = [
        HostState::Up,
        HostState::Down,
        HostState::Unreachable,
        HostState::Unknown,
        HostState::Pending,
    ];

    /// Numeric state id as used in search queries (`is:1`).
    pub fn id(&self) -> u8 {
        match self {
            HostState::Up => 0,
            HostState::Down => 1,
            HostState::Unreachable => 2,
            HostState::Unknown => 3,
            HostState::Pending => 4,
        }
    }

    /// Upper-case state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HostState::Up => "UP",
            HostState::Down => "DOWN",
            HostState::Unreachable => "UNREACHABLE",
            HostState::Unknown => "UNKNOWN",
            HostState::Pending => "PENDING",
        }
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HostState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

/// Current state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum ServiceState {
    Ok,
    Warning,
    Critical,
    Unknown,
    Unreachable,
    #[default]
    Pending,
}

impl ServiceState {
    pub const ALL: [ServiceState; 6] = [
        ServiceState::Ok,
        ServiceState::Warning,
        ServiceState::Critical,
        ServiceState::Unknown,
        ServiceState::Unreachable,
        ServiceState::Pending,
    ];

    /// Numeric state id as used in search queries (`is:2`).
    pub fn id(&self) -> u8 {
        match self {
            ServiceState::Ok => 0,
            ServiceState::Warning => 1,
            ServiceState::Critical => 2,
            ServiceState::Unknown => 3,
            ServiceState::Unreachable => 4,
            ServiceState::Pending => 5,
        }
    }

    /// Upper-case state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Ok => "OK",
            ServiceState::Warning => "WARNING",
            ServiceState::Critical => "CRITICAL",
            ServiceState::Unknown => "UNKNOWN",
            ServiceState::Unreachable => "UNREACHABLE",
            ServiceState::Pending => "PENDING",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_ids_are_unique() {
        let mut ids: Vec<u8> = HostState::ALL.iter().map(|s| s.id()).collect();
        ids.dedup();
        assert_eq!(ids.len(), HostState::ALL.len());

        let mut ids: Vec<u8> = ServiceState::ALL.iter().map(|s| s.id()).collect();
        ids.dedup();
        assert_eq!(ids.len(), ServiceState::ALL.len());
    }

    #[test]
    fn test_parse_state_names() {
        assert_eq!("down".parse::<HostState>(), Ok(HostState::Down));
        assert_eq!("CRITICAL".parse::<ServiceState>(), Ok(ServiceState::Critical));
        assert!("critical".parse::<HostState>().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_uses_upper_case_names() {
        let json = serde_json::to_string(&ServiceState::Warning).unwrap();
        assert_eq!(json, "\"WARNING\"");
        let parsed: StateType = serde_json::from_str("\"SOFT\"").unwrap();
        assert_eq!(parsed, StateType::Soft);
    }
}
