#![forbid(unsafe_code)]
use chrono::NaiveDate;
use ward_roster::{
    CancelToken, Eligibility, EngineConfig, Headcount, Member, MemberId, MemoryStore, Request,
    RequestId, RequestStatus, Rule, RunKey, RunOutcome, RunParams, SchedError, Scheduler,
    ShiftKind, StreakRule, WardBook, WardId,
};

fn ward_book(requests: Vec<Request>) -> WardBook {
    let mut book = WardBook::new(WardId::new("icu"));
    book.members = vec![
        Member::new("a", "Alice"),
        Member::new("b", "Bruno"),
        Member::new("c", "Chloé"),
        Member::new("d", "David"),
        Member::new("e", "Emma").with_eligibility(Eligibility::ALL.without(ShiftKind::Night)),
    ];
    book.rule = Some(Rule::uniform(Headcount::new(2, 1, 1)));
    book.requests = requests;
    book
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

fn request(id: &str, member: &str, day: u32, shift: ShiftKind) -> Request {
    Request::new(MemberId::new(member), date(day), shift).with_id(RequestId::new(id))
}

fn status_of(book: &WardBook, id: &str) -> RequestStatus {
    book.requests
        .iter()
        .find(|r| r.id.as_str() == id)
        .map(|r| r.status)
        .unwrap()
}

fn key() -> RunKey {
    RunKey::new(WardId::new("icu"), 2025, 3)
}

#[test]
fn single_day_request_is_honored() {
    let book = ward_book(vec![request("r1", "a", 10, ShiftKind::Day)]);
    let input = book.snapshot();
    let store = MemoryStore::new(book);

    let result = Scheduler::default()
        .generate(&store, &input, &RunParams::new(2025, 3))
        .unwrap();

    assert!(result.success);
    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(result.unreflected_requests_count, 0);

    let saved = store.book();
    let grid = saved.grid(&key()).unwrap();
    assert_eq!(grid.shift_on(&MemberId::new("a"), 10), Some(ShiftKind::Day));
    assert_eq!(status_of(&saved, "r1"), RequestStatus::Accepted);
}

#[test]
fn competing_night_requests_go_to_lower_member_id() {
    let book = ward_book(vec![
        request("r-b", "b", 10, ShiftKind::Night),
        request("r-a", "a", 10, ShiftKind::Night),
    ]);
    let input = book.snapshot();
    let store = MemoryStore::new(book);

    let result = Scheduler::default()
        .generate(&store, &input, &RunParams::new(2025, 3))
        .unwrap();

    let saved = store.book();
    let grid = saved.grid(&key()).unwrap();
    assert_eq!(grid.shift_on(&MemberId::new("a"), 10), Some(ShiftKind::Night));

    assert_eq!(result.unreflected_requests_count, 1);
    let record = &result.unreflected_requests[0];
    assert_eq!(record.request_id.as_str(), "r-b");
    assert_eq!(record.member_name, "Bruno");
    assert_eq!(record.requested, ShiftKind::Night);
    assert_eq!(
        Some(record.actual),
        grid.shift_on(&MemberId::new("b"), 10)
    );
    assert_ne!(record.actual, ShiftKind::Night);

    assert_eq!(status_of(&saved, "r-a"), RequestStatus::Accepted);
    assert_eq!(status_of(&saved, "r-b"), RequestStatus::Denied);
}

fn busy_ward() -> WardBook {
    let mut book = WardBook::new(WardId::new("icu"));
    book.members = (0..9)
        .map(|i| {
            let m = Member::new(format!("m{i}"), format!("Membre {i}"));
            match i {
                7 => m.with_eligibility(Eligibility::DAY.with(ShiftKind::Evening)),
                8 => m.with_eligibility(Eligibility::DAY.with(ShiftKind::Mid)),
                _ => m,
            }
        })
        .collect();
    let mut rule = Rule {
        weekday: Headcount {
            day: 2,
            evening: 2,
            night: 1,
            mid: 1,
        },
        weekend: Headcount::new(1, 1, 1),
        ..Rule::default()
    };
    rule.max_consecutive_night = StreakRule::mandatory(2);
    rule.min_consecutive_night = StreakRule::soft(2, 1);
    rule.off_after_night = StreakRule::soft(2, 4);
    rule.max_consecutive_shift = StreakRule::soft(5, 3);
    rule.off_after_streak = StreakRule::soft(2, 2);
    book.rule = Some(rule);
    book.requests = (1..=28)
        .map(|day| {
            let member = format!("m{}", day % 9);
            let shift = [ShiftKind::Off, ShiftKind::Night, ShiftKind::Day, ShiftKind::Evening]
                [day as usize % 4];
            request(&format!("q{day}"), &member, day, shift).with_memo("souhait")
        })
        .collect();
    book
}

#[test]
fn generated_grid_respects_hard_constraints() {
    let book = busy_ward();
    let input = book.snapshot();
    let rule = book.rule.clone().unwrap();
    let members = book.members.clone();
    let store = MemoryStore::new(book);
    let scheduler = Scheduler::default();

    let result = scheduler
        .generate(&store, &input, &RunParams::new(2025, 3))
        .unwrap();
    assert!(result.deficits.is_empty());
    assert!(result.penalty_after <= result.penalty_before);

    let saved = store.book();
    let grid = saved.grid(&key()).unwrap();
    assert_eq!(grid.days(), 31);
    assert_eq!(grid.rows.len(), members.len());

    for day in 1..=31u32 {
        let weekend = matches!(
            chrono::Datelike::weekday(&date(day)),
            chrono::Weekday::Sat | chrono::Weekday::Sun
        );
        let headcount = rule.headcount(weekend);
        for kind in [ShiftKind::Day, ShiftKind::Evening, ShiftKind::Night, ShiftKind::Mid] {
            assert_eq!(
                grid.count_on(day, kind) as u32,
                headcount.for_kind(kind),
                "day {day} {kind}"
            );
        }
    }
    for member in &members {
        let row = grid.row(&member.id).unwrap();
        assert_eq!(row.shifts.len(), 31);
        assert!(row.shifts.iter().all(|k| *k != ShiftKind::Unassigned));
        assert!(row.shifts.iter().all(|k| member.can_work(*k)));
    }

    let evaluation = scheduler.evaluate(grid, &members, &rule).unwrap();
    assert!(evaluation.hard_feasible);

    // chaque demande Hold reçoit un statut final, et les refusées sont rapportées
    let denied = saved
        .requests
        .iter()
        .filter(|r| r.status == RequestStatus::Denied)
        .count();
    assert!(saved.requests.iter().all(|r| r.status.is_final()));
    assert_eq!(denied, result.unreflected_requests_count);
}

#[test]
fn forced_reruns_are_identical() {
    let book = busy_ward();
    let input = book.snapshot();
    let store = MemoryStore::new(book);
    let scheduler = Scheduler::default();
    let params = RunParams::new(2025, 3).force(true);

    let first = scheduler.generate(&store, &input, &params).unwrap();
    let first_grid = store.book().grid(&key()).cloned().unwrap();

    // même instantané d'entrée, le magasin a déjà un planning
    let fresh = MemoryStore::new(WardBook {
        schedules: vec![first_grid.clone()],
        ..busy_ward()
    });
    let second = scheduler.generate(&fresh, &input, &params).unwrap();
    let second_grid = fresh.book().grid(&key()).cloned().unwrap();

    assert_eq!(first_grid, second_grid);
    assert_eq!(first.unreflected_requests, second.unreflected_requests);
}

#[test]
fn existing_grid_without_force_is_a_conflict() {
    let book = ward_book(vec![request("r1", "a", 10, ShiftKind::Day)]);
    let input = book.snapshot();
    let store = MemoryStore::new(book);
    let scheduler = Scheduler::default();

    scheduler
        .generate(&store, &input, &RunParams::new(2025, 3))
        .unwrap();
    let before = serde_json::to_value(store.book()).unwrap();

    let result = scheduler
        .generate(&store, &input, &RunParams::new(2025, 3))
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.outcome, RunOutcome::Conflict);
    assert_eq!(result.unreflected_requests_count, 0);
    assert_eq!(serde_json::to_value(store.book()).unwrap(), before);
}

#[test]
fn shortage_reports_deficit_and_still_persists() {
    let mut book = ward_book(Vec::new());
    book.rule = Some(Rule::uniform(Headcount::new(2, 1, 5)));
    let input = book.snapshot();
    let store = MemoryStore::new(book);

    let result = Scheduler::default()
        .generate(&store, &input, &RunParams::new(2025, 3))
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.outcome, RunOutcome::CoverageDeficit);
    assert!(result.message.contains("coverage deficit"));
    // 4 membres aptes de nuit pour 5 requis, tous pris par la nuit
    assert!(result
        .deficits
        .iter()
        .any(|d| d.kind == ShiftKind::Night && d.required == 5 && d.assigned == 4));
    let saved = store.book();
    let grid = saved.grid(&key()).unwrap();
    assert_eq!(grid.count_on(1, ShiftKind::Night), 4);
}

#[test]
fn invalid_input_is_rejected() {
    let scheduler = Scheduler::default();
    let mut book = ward_book(Vec::new());
    book.rule = None;
    let store = MemoryStore::new(book.clone());
    assert!(matches!(
        scheduler.generate(&store, &book.snapshot(), &RunParams::new(2025, 3)),
        Err(SchedError::InvalidInput(_))
    ));

    let mut empty = ward_book(Vec::new());
    empty.members.clear();
    assert!(matches!(
        scheduler.generate(&store, &empty.snapshot(), &RunParams::new(2025, 3)),
        Err(SchedError::InvalidInput(_))
    ));

    let book = ward_book(Vec::new());
    assert!(matches!(
        scheduler.generate(&store, &book.snapshot(), &RunParams::new(2025, 13)),
        Err(SchedError::InvalidInput(_))
    ));
}

#[test]
fn cancelled_run_persists_nothing() {
    let book = busy_ward();
    let input = book.snapshot();
    let store = MemoryStore::new(book);
    let token = CancelToken::new();
    token.cancel();

    let err = Scheduler::default()
        .generate_with_cancel(&store, &input, &RunParams::new(2025, 3), &token)
        .unwrap_err();
    assert!(matches!(err, SchedError::Cancelled(_)));
    let saved = store.book();
    assert!(saved.grid(&key()).is_none());
    assert!(saved.requests.iter().all(|r| r.status == RequestStatus::Hold));
}

#[test]
fn concurrent_run_on_same_month_is_rejected() {
    let book = ward_book(Vec::new());
    let input = book.snapshot();
    let store = MemoryStore::new(book);
    let scheduler = Scheduler::default();

    let permit = scheduler.runs().try_acquire(key()).unwrap();
    assert!(matches!(
        scheduler.generate(&store, &input, &RunParams::new(2025, 3)),
        Err(SchedError::RunInProgress(_))
    ));
    drop(permit);
    assert!(scheduler
        .generate(&store, &input, &RunParams::new(2025, 3))
        .is_ok());
}

#[test]
fn restricted_retry_still_settles_every_hold_request() {
    let book = ward_book(vec![
        request("r1", "a", 5, ShiftKind::Off),
        request("r2", "b", 6, ShiftKind::Off),
        request("r3", "e", 7, ShiftKind::Night),
    ]);
    let input = book.snapshot();
    let store = MemoryStore::new(book);

    let params = RunParams::new(2025, 3).only_requests(vec![RequestId::new("r1")]);
    let result = Scheduler::default()
        .generate(&store, &input, &params)
        .unwrap();

    let saved = store.book();
    let grid = saved.grid(&key()).unwrap();
    assert_eq!(grid.shift_on(&MemberId::new("a"), 5), Some(ShiftKind::Off));
    assert_eq!(status_of(&saved, "r1"), RequestStatus::Accepted);
    // e n'est pas apte de nuit : demande impossible, rapportée
    assert_eq!(status_of(&saved, "r3"), RequestStatus::Denied);
    assert!(result
        .unreflected_requests
        .iter()
        .any(|r| r.request_id.as_str() == "r3"));
    assert!(saved.requests.iter().all(|r| r.status.is_final()));

    // r2 reste en arrière-plan : statut fidèle au planning, coût d'arrière-plan seulement
    let b_on_6 = grid.shift_on(&MemberId::new("b"), 6);
    let r2_denied = result
        .unreflected_requests
        .iter()
        .any(|r| r.request_id.as_str() == "r2");
    if b_on_6 == Some(ShiftKind::Off) {
        assert_eq!(status_of(&saved, "r2"), RequestStatus::Accepted);
        assert!(!r2_denied);
        assert_eq!(result.penalty_after, 0);
    } else {
        assert_eq!(status_of(&saved, "r2"), RequestStatus::Denied);
        assert!(r2_denied);
        assert_eq!(result.penalty_after, EngineConfig::default().background_penalty);
    }
}

#[test]
fn already_settled_requests_are_left_alone() {
    let mut settled = request("old", "c", 3, ShiftKind::Night);
    settled.status = RequestStatus::Denied;
    let book = ward_book(vec![settled]);
    let input = book.snapshot();
    let store = MemoryStore::new(book);

    let result = Scheduler::default()
        .generate(&store, &input, &RunParams::new(2025, 3))
        .unwrap();
    assert_eq!(result.unreflected_requests_count, 0);
    assert_eq!(status_of(&store.book(), "old"), RequestStatus::Denied);
}

/// Mid a son propre effectif et n'entre pas dans les règles de nuit,
/// seulement dans la longueur des séquences travaillées.
#[test]
fn mid_is_configured_independently() {
    let mut book = ward_book(Vec::new());
    book.members[0].eligibility = Eligibility::MID;
    let mut rule = Rule::uniform(Headcount::new(1, 1, 1));
    rule.weekday.mid = 1;
    book.rule = Some(rule);
    let input = book.snapshot();
    let store = MemoryStore::new(book);

    let config = EngineConfig {
        max_sweeps: Some(3),
        ..EngineConfig::default()
    };
    Scheduler::new(config)
        .generate(&store, &input, &RunParams::new(2025, 3))
        .unwrap();

    let saved = store.book();
    let grid = saved.grid(&key()).unwrap();
    // 2025-03-03 est un lundi, 2025-03-01 un samedi
    assert_eq!(grid.count_on(3, ShiftKind::Mid), 1);
    assert_eq!(grid.count_on(1, ShiftKind::Mid), 0);
    assert_eq!(grid.shift_on(&MemberId::new("a"), 3), Some(ShiftKind::Mid));
}

/// Deux membres, un seul poste de jour : a travaille les jours impairs, b les jours pairs.
fn pair_book(requests: Vec<Request>) -> WardBook {
    let mut book = WardBook::new(WardId::new("icu"));
    book.members = vec![Member::new("a", "Alice"), Member::new("b", "Bruno")];
    book.rule = Some(Rule::uniform(Headcount::new(1, 0, 0)));
    book.requests = requests;
    book
}

#[test]
fn background_requests_are_best_effort_only() {
    let book = pair_book(vec![
        request("ra", "a", 1, ShiftKind::Off),
        request("rb1", "b", 1, ShiftKind::Day),
        request("rb2", "b", 2, ShiftKind::Off),
    ]);
    let input = book.snapshot();
    let store = MemoryStore::new(book);

    let params = RunParams::new(2025, 3).only_requests(vec![RequestId::new("ra")]);
    let result = Scheduler::default()
        .generate(&store, &input, &params)
        .unwrap();

    // 10 (actif) + 1 + 1 (arrière-plan) ; l'échange de a sert aussi rb1
    assert_eq!(result.penalty_before, 12);
    assert_eq!(result.penalty_after, 1);
    let saved = store.book();
    assert_eq!(status_of(&saved, "ra"), RequestStatus::Accepted);
    assert_eq!(status_of(&saved, "rb1"), RequestStatus::Accepted);
    // jamais recherchée activement
    assert_eq!(status_of(&saved, "rb2"), RequestStatus::Denied);
    assert_eq!(result.unreflected_requests_count, 1);
    assert_eq!(result.unreflected_requests[0].actual, ShiftKind::Day);
}

#[test]
fn sweep_cap_keeps_partial_improvement() {
    let book = pair_book(vec![request("ra", "a", 1, ShiftKind::Off)]);
    let input = book.snapshot();
    let store = MemoryStore::new(book.clone());
    let config = EngineConfig {
        max_sweeps: Some(1),
        ..EngineConfig::default()
    };

    let result = Scheduler::new(config)
        .generate(&store, &input, &RunParams::new(2025, 3))
        .unwrap();

    assert!(result.success);
    assert!(result.repair_capped);
    assert_eq!(result.penalty_before, 10);
    assert_eq!(result.penalty_after, 0);
    let saved = store.book();
    let grid = saved.grid(&key()).unwrap();
    assert_eq!(grid.shift_on(&MemberId::new("a"), 1), Some(ShiftKind::Off));
    assert_eq!(status_of(&saved, "ra"), RequestStatus::Accepted);

    let uncapped = MemoryStore::new(book);
    let result = Scheduler::default()
        .generate(&uncapped, &input, &RunParams::new(2025, 3))
        .unwrap();
    assert!(!result.repair_capped);
}

#[test]
fn repair_timeout_commits_the_skeleton() {
    let book = pair_book(vec![request("ra", "a", 1, ShiftKind::Off)]);
    let input = book.snapshot();
    let store = MemoryStore::new(book);
    let config = EngineConfig {
        repair_timeout_ms: Some(0),
        ..EngineConfig::default()
    };

    let result = Scheduler::new(config)
        .generate(&store, &input, &RunParams::new(2025, 3))
        .unwrap();

    assert!(result.success);
    assert!(result.repair_capped);
    assert_eq!(result.penalty_after, result.penalty_before);
    let saved = store.book();
    let grid = saved.grid(&key()).unwrap();
    assert_eq!(grid.shift_on(&MemberId::new("a"), 1), Some(ShiftKind::Day));
    assert_eq!(status_of(&saved, "ra"), RequestStatus::Denied);
}

#[test]
fn unavoidable_mandatory_breach_is_reported() {
    let mut book = pair_book(Vec::new());
    book.members[1].eligibility = Eligibility::DAY;
    let mut rule = Rule::uniform(Headcount::new(0, 0, 1));
    rule.max_consecutive_night = StreakRule::mandatory(3);
    rule.max_consecutive_shift = StreakRule::soft(40, 5_000);
    book.rule = Some(rule);
    let input = book.snapshot();
    let store = MemoryStore::new(book);

    let result = Scheduler::default()
        .generate(&store, &input, &RunParams::new(2025, 3))
        .unwrap();

    // seule a peut tenir la nuit : 31 nuits d'affilée
    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(result.mandatory_breaches.len(), 1);
    let breach = &result.mandatory_breaches[0];
    assert_eq!(breach.member_id, MemberId::new("a"));
    assert_eq!(breach.rule, "max_consecutive_night");
    assert_eq!(breach.units, 28);
    assert!(result.message.contains("mandatory rule breach"));
    assert!(store.book().grid(&key()).is_some());
}
