//! Entity builders shared by unit tests.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    Blueprint, Enrollment, EnrollmentStatus, Order, OrderStatus, Profile, Program, ProgramStatus,
    ProgressEntry, Role, RoutineBlock, WorkoutFormat,
};

pub fn profile(role: Role) -> Profile {
    Profile {
        id: Uuid::new_v4(),
        email: "coach@example.com".to_string(),
        display_name: "Coach".to_string(),
        role,
        bio: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn sample_program(price: i64, access_days: Option<i32>) -> Program {
    Program {
        id: 1,
        coach_id: Uuid::new_v4(),
        slug: "strength-basics".to_string(),
        title: "Strength Basics".to_string(),
        summary: Some("Twelve weeks of barbell work".to_string()),
        description: "Squat, press, deadlift.".to_string(),
        price,
        currency: "KRW".to_string(),
        access_days,
        thumbnail_url: None,
        status: ProgramStatus::Published,
        published_at: Some(Utc::now()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn blueprint(day_number: i32) -> Blueprint {
    Blueprint {
        id: day_number as i64,
        program_id: 1,
        day_number,
        title: format!("Day {}", day_number),
        notes: None,
        is_rest_day: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn routine_block(format: WorkoutFormat, time_cap: Option<i32>, rounds: Option<i32>) -> RoutineBlock {
    RoutineBlock {
        id: 1,
        coach_id: Uuid::new_v4(),
        name: "Fran".to_string(),
        format,
        time_cap_minutes: time_cap,
        rounds,
        description: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn order(status: OrderStatus, buyer_id: Uuid, amount: i64) -> Order {
    Order {
        id: 10,
        order_number: "20260101-AbCdEfGhIjKl".to_string(),
        buyer_id,
        program_id: 1,
        program_title: Some("Strength Basics".to_string()),
        amount,
        currency: "KRW".to_string(),
        status,
        payment_key: None,
        payment_method: None,
        failure_code: None,
        failure_message: None,
        approved_at: None,
        refunded_at: None,
        refund_reason: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn enrollment(
    status: EnrollmentStatus,
    starts_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
) -> Enrollment {
    Enrollment {
        id: 5,
        user_id: Uuid::new_v4(),
        program_id: 1,
        order_id: None,
        status,
        starts_at,
        expires_at,
        created_at: starts_at,
        updated_at: starts_at,
    }
}

pub fn progress_entry(day_number: i32) -> ProgressEntry {
    ProgressEntry {
        id: day_number as i64,
        enrollment_id: 5,
        blueprint_id: day_number as i64,
        day_number,
        result: None,
        note: None,
        completed_at: Utc::now(),
    }
}
