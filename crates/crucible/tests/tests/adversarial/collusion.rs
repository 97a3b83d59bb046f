//! Adversarial test: roles that agree with each other cannot produce a
//! decision. Every decision rests on a resolved conflict between two
//! different roles.

use chrono::Utc;
use crucible_kernel::CrucibleConfig;
use crucible_ledger::events::PlanProposed;
use crucible_synthesizer::merge::detect_conflicts;
use crucible_tests::{incident_signals, primary};
use crucible_types::{
    AgentOutputs, CatalystId, Decision, ErrorClass, OpKind, Plan, PlanId, PlanValidationError,
    ResolvedConflict, RoleKind, RoleOutput, Stance,
};

const THESIS: &str = "raise the checkout gateway pool limit";

/// Four roles that all endorse the thesis, the provocateur included.
fn unanimous() -> AgentOutputs {
    AgentOutputs {
        innovator: RoleOutput::new(RoleKind::Innovator, Stance::Propose, THESIS, 1.0),
        falsifier: RoleOutput::new(RoleKind::Falsifier, Stance::Approve, "no defect", 1.0),
        narrator: RoleOutput::new(RoleKind::Narrator, Stance::Approve, "coherent", 1.0),
        provocateur: RoleOutput::new(RoleKind::Provocateur, Stance::Question, THESIS, 1.0)
            .with_novelty(0.0),
    }
}

fn plan(conflict: Option<ResolvedConflict>) -> Plan {
    Plan {
        id: PlanId::new("plan-collusion"),
        catalyst_id: CatalystId::new("cat-collusion"),
        cycle: 1,
        thesis: THESIS.into(),
        antithesis: None,
        synthesis_text: THESIS.into(),
        confidence: 1.0,
        agent_outputs: unanimous(),
        resolved_conflict: conflict,
        attempt: 0,
        created_at: Utc::now(),
    }
}

#[test]
fn unanimous_roles_surface_no_conflict() {
    assert!(detect_conflicts(&unanimous()).is_empty());
    let err = Decision::try_from_plan(&plan(None), 0.0, 0).unwrap_err();
    assert!(matches!(err, PlanValidationError::MissingConflict(_)));
    assert_eq!(err.class(), ErrorClass::ValidationError);
}

#[test]
fn a_role_cannot_conflict_with_itself() {
    for role in RoleKind::ALL {
        let forged = plan(Some(ResolvedConflict {
            agent_a: role,
            agent_b: role,
            description: "argued with myself".into(),
        }));
        assert!(matches!(
            Decision::try_from_plan(&forged, 0.0, 0),
            Err(PlanValidationError::SelfConflict(r)) if r == role
        ));
    }
}

#[test]
fn conflicts_need_a_description() {
    let forged = plan(Some(ResolvedConflict {
        agent_a: RoleKind::Innovator,
        agent_b: RoleKind::Falsifier,
        description: " \t ".into(),
    }));
    assert!(matches!(
        Decision::try_from_plan(&forged, 0.0, 0),
        Err(PlanValidationError::EmptyConflictDescription(_))
    ));

    let honest = plan(Some(ResolvedConflict {
        agent_a: RoleKind::Innovator,
        agent_b: RoleKind::Falsifier,
        description: "falsifier objected to the unbounded pool".into(),
    }));
    let decision = Decision::try_from_plan(&honest, 0.5, 0).unwrap();
    assert!(decision.accepted);
    assert_eq!(decision.plan_id, honest.id);
}

#[tokio::test]
async fn recorded_plans_carry_a_real_conflict() {
    let (_, orch) = primary(CrucibleConfig::demo(), incident_signals()).await;
    orch.run_cycle(false).await.unwrap();

    let ledger = &orch.crucible().ledger;
    let plans = ledger.records_of(OpKind::PlanProposed).await.unwrap();
    assert!(!plans.is_empty());
    let plans_seen = plans.len();
    for record in plans {
        let plan: PlanProposed = serde_json::from_value(record.payload).unwrap();
        let conflict = plan.resolved_conflict.expect("recorded plan without a conflict");
        assert_ne!(conflict.agent_a, conflict.agent_b);
        assert!(!conflict.description.trim().is_empty());
    }
    // Genesis passes decide through the same gate: one decision per plan.
    let decisions = ledger.records_of(OpKind::DecisionRecorded).await.unwrap();
    assert_eq!(decisions.len(), plans_seen);
}
