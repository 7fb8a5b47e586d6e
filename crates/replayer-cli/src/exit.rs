// Exit codes for CI triage
use replayer_common::ReplayStatus;

pub const EXIT_PASS: i32 = 0;
pub const EXIT_FAIL: i32 = 1;
pub const EXIT_CRASH: i32 = 2;
/// Configuration problems and anything else that stopped the run
pub const EXIT_FATAL: i32 = 3;

pub fn exit_code(status: ReplayStatus) -> i32 {
    match status {
        ReplayStatus::Pass => EXIT_PASS,
        ReplayStatus::Fail => EXIT_FAIL,
        ReplayStatus::Crash => EXIT_CRASH,
    }
}
