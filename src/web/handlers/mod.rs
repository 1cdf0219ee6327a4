//! HTML template rendering handlers for members and coaches.

mod account;
mod catalog;
mod checkout;
mod coach_curriculum;
mod coach_orders;
mod coach_programs;
mod coach_routines;
mod learn;
mod member;

pub use account::{
    login_handler, login_page_handler, logout_handler, signup_handler, signup_page_handler,
};
pub use catalog::{catalog_handler, program_page_handler};
pub use checkout::{checkout_handler, payment_fail_handler, payment_success_handler};
pub use coach_curriculum::{
    add_day_handler, add_section_handler, copy_day_handler, curriculum_handler,
    day_editor_handler, delete_day_handler, delete_section_handler, move_section_handler,
    update_day_handler, update_section_handler,
};
pub use coach_orders::{coach_orders_handler, refund_handler};
pub use coach_programs::{
    archive_program_handler, coach_overview_handler, create_program_handler,
    delete_program_handler, edit_program_handler, members_handler, new_program_handler,
    publish_program_handler, unpublish_program_handler, update_program_handler,
    upload_thumbnail_handler,
};
pub use coach_routines::{
    add_exercise_handler, create_routine_handler, delete_routine_handler, remove_exercise_handler,
    routine_handler, routines_handler, update_routine_handler,
};
pub use learn::{complete_day_handler, day_handler, plan_handler, reset_day_handler};
pub use member::{dashboard_handler, orders_handler};
