//! The fixed perspective catalog.
//!
//! Ten lenses in two groups. Order matters: stages execute and report in
//! catalog order, and the pivot-focus subset is defined by name, not by
//! position.

use crucible_types::{Perspective, PerspectiveGroup};

/// The first pass every session runs, in this order.
pub const CORE_PERSPECTIVES: [Perspective; 5] = [
    Perspective {
        name: "first_principles",
        label: "First Principles",
        focus: "the underlying problem, who actually has it, and whether this \
                idea is the simplest honest solution",
        group: PerspectiveGroup::Core,
    },
    Perspective {
        name: "design",
        label: "Design",
        focus: "user experience, product surface, and how hard the idea is to \
                explain and demo",
        group: PerspectiveGroup::Core,
    },
    Perspective {
        name: "marketing_potential",
        label: "Marketing Potential",
        focus: "market size, differentiation, and whether anyone would seek \
                this out unprompted",
        group: PerspectiveGroup::Core,
    },
    Perspective {
        name: "technical",
        label: "Technical",
        focus: "build feasibility, hard dependencies, and what a minimal \
                working version requires",
        group: PerspectiveGroup::Core,
    },
    Perspective {
        name: "financial",
        label: "Financial",
        focus: "unit economics, pricing power, and the path to covering costs",
        group: PerspectiveGroup::Core,
    },
];

/// The adversarial second pass, in this order.
pub const HARSH_PERSPECTIVES: [Perspective; 5] = [
    Perspective {
        name: "devils_advocate",
        label: "Devil's Advocate",
        focus: "the strongest case against the idea, argued in good faith",
        group: PerspectiveGroup::Harsh,
    },
    Perspective {
        name: "copycat",
        label: "Copycat",
        focus: "how fast and cheaply an incumbent could clone this, and what \
                stops them",
        group: PerspectiveGroup::Harsh,
    },
    Perspective {
        name: "user_psychology",
        label: "User Psychology",
        focus: "what users say versus what they do, and whether the behavior \
                change this idea requires ever happens",
        group: PerspectiveGroup::Harsh,
    },
    Perspective {
        name: "scalability",
        label: "Scalability",
        focus: "what breaks at 10x and 100x: operations, support, margins",
        group: PerspectiveGroup::Harsh,
    },
    Perspective {
        name: "worst_case",
        label: "Worst Case",
        focus: "the most plausible failure story, told end to end",
        group: PerspectiveGroup::Harsh,
    },
];

/// Harsh perspective names retained when the gate chooses pivot focus.
pub const PIVOT_HARSH: [&str; 2] = ["devils_advocate", "copycat"];

/// The harsh perspectives a session in the given reduced scope runs.
pub fn harsh_for(pivot_focus: bool) -> Vec<&'static Perspective> {
    HARSH_PERSPECTIVES
        .iter()
        .filter(|p| !pivot_focus || PIVOT_HARSH.contains(&p.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_order_is_fixed() {
        let names: Vec<&str> = CORE_PERSPECTIVES.iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec![
                "first_principles",
                "design",
                "marketing_potential",
                "technical",
                "financial"
            ]
        );
        assert!(CORE_PERSPECTIVES
            .iter()
            .all(|p| p.group == PerspectiveGroup::Core));
    }

    #[test]
    fn harsh_order_is_fixed() {
        let names: Vec<&str> = HARSH_PERSPECTIVES.iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec![
                "devils_advocate",
                "copycat",
                "user_psychology",
                "scalability",
                "worst_case"
            ]
        );
        assert!(HARSH_PERSPECTIVES
            .iter()
            .all(|p| p.group == PerspectiveGroup::Harsh));
    }

    #[test]
    fn pivot_focus_keeps_exactly_two() {
        let names: Vec<&str> = harsh_for(true).iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["devils_advocate", "copycat"]);
    }

    #[test]
    fn full_scope_keeps_all_five() {
        assert_eq!(harsh_for(false).len(), 5);
    }

    #[test]
    fn names_are_unique_across_the_catalog() {
        let mut names: Vec<&str> = CORE_PERSPECTIVES
            .iter()
            .chain(HARSH_PERSPECTIVES.iter())
            .map(|p| p.name)
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 10);
    }
}
