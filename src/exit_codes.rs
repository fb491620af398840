//! Exit code constants for the fleetlock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config)
//! - 2: The guarded command failed
//! - 3: Coordination store unreachable or misbehaving
//! - 4: Lock could not be acquired or released
//! - 5: Process probe failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// The guarded command ran and failed.
pub const ACTION_FAILURE: i32 = 2;

/// Coordination store failure: connection refused, unexpected result codes.
pub const STORE_FAILURE: i32 = 3;

/// Lock failure: acquisition timed out or release refused.
pub const LOCK_FAILURE: i32 = 4;

/// Process search primitive failed.
pub const PROBE_FAILURE: i32 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            ACTION_FAILURE,
            STORE_FAILURE,
            LOCK_FAILURE,
            PROBE_FAILURE,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(SUCCESS, 0);
    }
}
