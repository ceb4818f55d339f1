use std::fmt;

use crate::eig::{Decision, Participant, ProcessId};

/// The three correctness properties of Byzantine agreement.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Property {
    Validity,
    Termination,
    Agreement,
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Validity => write!(f, "validity"),
            Property::Termination => write!(f, "termination"),
            Property::Agreement => write!(f, "agreement"),
        }
    }
}

/// Outcome of a finished run.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Report {
    pub decisions: Vec<(ProcessId, Decision)>,
    pub byzantine: Vec<ProcessId>,
    pub agreement: bool,
    pub validity: bool,
    pub termination: bool,
}

impl Report {
    pub fn evaluate(processes: &[Participant]) -> Self {
        Report {
            decisions: processes.iter().map(|p| (p.id(), p.decision())).collect(),
            byzantine: processes
                .iter()
                .filter(|p| p.is_byzantine())
                .map(|p| p.id())
                .collect(),
            agreement: check_agreement(processes),
            validity: check_validity(processes),
            termination: check_termination(processes),
        }
    }

    pub fn failures(&self) -> Vec<Property> {
        [
            (Property::Validity, self.validity),
            (Property::Termination, self.termination),
            (Property::Agreement, self.agreement),
        ]
        .into_iter()
        .filter(|(_, holds)| !holds)
        .map(|(property, _)| property)
        .collect()
    }

    pub fn holds(&self) -> bool {
        self.agreement && self.validity && self.termination
    }

    pub fn decision_of(&self, id: ProcessId) -> Option<Decision> {
        self.decisions
            .iter()
            .find(|(pid, _)| *pid == id)
            .map(|(_, decision)| *decision)
    }

    /// Decisions of the participants outside the Byzantine set.
    pub fn correct_decisions(&self) -> Vec<Decision> {
        self.decisions
            .iter()
            .filter(|(id, _)| !self.byzantine.contains(id))
            .map(|(_, decision)| *decision)
            .collect()
    }

    /// `-` when every property holds, otherwise the failed ones joined by `-`.
    pub fn requirements(&self) -> String {
        let failures = self.failures();
        if failures.is_empty() {
            return "-".to_string();
        }
        failures
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.requirements())
    }
}

fn correct(processes: &[Participant]) -> impl Iterator<Item = &Participant> {
    processes.iter().filter(|p| !p.is_byzantine())
}

/// All correct participants decided the same. Holds vacuously when there
/// are no correct participants.
pub fn check_agreement(processes: &[Participant]) -> bool {
    let decisions: Vec<Decision> = correct(processes).map(|p| p.decision()).collect();
    decisions.windows(2).all(|w| w[0] == w[1])
}

/// If every correct participant started with `v`, every correct
/// participant decided `v`.
pub fn check_validity(processes: &[Participant]) -> bool {
    let mut initial = correct(processes).map(|p| p.initial_value());
    let Some(first) = initial.next() else {
        return true;
    };
    if initial.any(|v| v != first) {
        return true;
    }
    correct(processes).all(|p| p.decision() == Decision::Decided(first))
}

pub fn check_termination(processes: &[Participant]) -> bool {
    correct(processes).all(|p| p.decision().is_decided())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eig::Bit;

    fn report(agreement: bool, validity: bool, termination: bool) -> Report {
        Report {
            decisions: Vec::new(),
            byzantine: Vec::new(),
            agreement,
            validity,
            termination,
        }
    }

    #[test]
    fn test_requirements_string() {
        assert_eq!(report(true, true, true).requirements(), "-");
        assert_eq!(report(false, true, true).requirements(), "agreement");
        assert_eq!(
            report(false, false, false).requirements(),
            "validity-termination-agreement"
        );
        assert!(!report(true, false, true).holds());
    }

    #[test]
    fn test_correct_decisions_skip_byzantine() {
        let report = Report {
            decisions: vec![
                (1, Decision::Decided(Bit::One)),
                (2, Decision::Decided(Bit::Zero)),
                (3, Decision::Decided(Bit::One)),
            ],
            byzantine: vec![2],
            agreement: true,
            validity: true,
            termination: true,
        };

        assert_eq!(report.correct_decisions(), vec![Decision::Decided(Bit::One); 2]);
        assert_eq!(report.decision_of(2), Some(Decision::Decided(Bit::Zero)));
        assert_eq!(report.decision_of(4), None);
    }
}
