//! Two-motor differential drive.
//!
//! A [`Steering`] pairs a left and a right [`TachoMotor`] and drives them
//! together. `turn` runs from -100 (spin left) through 0 (straight) to 100
//! (spin right); the inner wheel is slowed by `turn / 50` of the outer one,
//! so at ±50 it stands still and at ±100 it runs backwards at full speed.
//!
//! Both motors must offer the same stop actions, checked on construction.

use std::time::Duration;

use crate::{
    chain::{ensure_range, ErrorSink},
    error::{Error, Result},
    motor::TachoMotor,
    state::MotorState,
    tracing::prelude::*,
    wait::WaitRequest,
};

const RUN_TO_REL_POS: &str = "run-to-rel-pos";
const RUN_TIMED: &str = "run-timed";
const STOP: &str = "stop";
const POSITION_SP: &str = "position_sp";
const SPEED_SP: &str = "speed_sp";

#[derive(Debug)]
pub struct Steering {
    left: TachoMotor,
    right: TachoMotor,
}

impl Steering {
    pub fn new(mut left: TachoMotor, mut right: TachoMotor) -> Result<Self> {
        let left_actions = left.stop_actions()?;
        let right_actions = right.stop_actions()?;
        if left_actions != right_actions {
            return Err(Error::ActionsMismatch {
                left: left_actions,
                right: right_actions,
            });
        }
        Ok(Self { left, right })
    }

    pub fn left(&mut self) -> &mut TachoMotor {
        &mut self.left
    }

    pub fn right(&mut self) -> &mut TachoMotor {
        &mut self.right
    }

    pub fn into_motors(self) -> (TachoMotor, TachoMotor) {
        (self.left, self.right)
    }

    /// The common stop action of both motors.
    pub fn stop_action(&mut self) -> Result<String> {
        let left = self.left.stop_action()?;
        let right = self.right.stop_action()?;
        if left != right {
            return Err(Error::ActionMismatch { left, right });
        }
        Ok(left)
    }

    pub fn set_stop_action(&mut self, action: &str) -> Result<()> {
        self.left.set_stop_action(action).err()?;
        self.right.set_stop_action(action).err()
    }

    pub fn stop(&mut self) -> Result<()> {
        self.left.command(STOP).err()?;
        self.right.command(STOP).err()
    }

    /// Drive until the outer wheel has turned `counts` tacho counts.
    pub fn steer_counts(&mut self, speed: i32, turn: i32, counts: i64) -> Result<()> {
        let (left_speed, right_speed) = split(SPEED_SP, speed.into(), turn)?;
        let (left_counts, right_counts) = split(POSITION_SP, counts, turn)?;
        debug!(speed, turn, counts, "Steering by counts");

        run_to_rel_pos(&mut self.left, narrow(left_speed)?, left_counts)?;
        run_to_rel_pos(&mut self.right, narrow(right_speed)?, right_counts)
    }

    /// Drive both wheels for `duration`.
    pub fn steer_duration(&mut self, speed: i32, turn: i32, duration: Duration) -> Result<()> {
        let (left_speed, right_speed) = split(SPEED_SP, speed.into(), turn)?;
        debug!(speed, turn, duration_ms = duration.as_millis(), "Steering by time");

        run_timed(&mut self.left, narrow(left_speed)?, duration)?;
        run_timed(&mut self.right, narrow(right_speed)?, duration)
    }

    /// Wait for both motors to stop running. `None` waits forever.
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<(MotorState, MotorState)> {
        let mut request = WaitRequest::stopped();
        request.timeout = timeout;
        let (left, right) = tokio::try_join!(self.left.wait(&request), self.right.wait(&request))?;
        Ok((left.into_result()?, right.into_result()?))
    }
}

/// Left and right share of `x` for `turn`. `x` is the setpoint written to
/// `attr` and must fit in 32 bits.
fn split(attr: &str, x: i64, turn: i32) -> Result<(i64, i64)> {
    ensure_range("turn", turn, -100, 100)?;
    ensure_range(attr, x, i32::MIN.into(), i32::MAX.into())?;
    let inner = x - x * i64::from(turn.abs()) / 50;
    Ok(match turn {
        t if t > 0 => (x, inner),
        t if t < 0 => (inner, x),
        _ => (x, x),
    })
}

fn narrow(speed: i64) -> Result<i32> {
    i32::try_from(speed).map_err(|_| Error::validation(SPEED_SP, format!("{speed} overflows")))
}

fn run_to_rel_pos(motor: &mut TachoMotor, speed: i32, counts: i64) -> Result<()> {
    motor
        .set_speed_sp(speed)
        .set_position_sp(counts)
        .command(RUN_TO_REL_POS)
        .err()
}

fn run_timed(motor: &mut TachoMotor, speed: i32, duration: Duration) -> Result<()> {
    motor
        .set_speed_sp(speed)
        .set_time_sp(duration)
        .command(RUN_TIMED)
        .err()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{locator::Locator, motor::tests::add_motor};
    use std::{fs, path::Path};

    fn pair(root: &Path) -> (TachoMotor, TachoMotor) {
        add_motor(root, "motor0", "ev3-ports:outB", "lego-ev3-l-motor");
        add_motor(root, "motor1", "ev3-ports:outC", "lego-ev3-l-motor");
        let locator = Locator::new(root);
        let open = |port| {
            TachoMotor::resolve(&locator, port, "lego-ev3-l-motor")
                .unwrap()
                .strict()
                .unwrap()
        };
        (open("ev3-ports:outB"), open("ev3-ports:outC"))
    }

    fn read(root: &Path, motor: &str, attr: &str) -> String {
        fs::read_to_string(root.join("tacho-motor").join(motor).join(attr)).unwrap()
    }

    #[test]
    fn test_split() {
        assert_eq!(split(POSITION_SP, 500, 0).unwrap(), (500, 500));
        assert_eq!(split(POSITION_SP, 500, 50).unwrap(), (500, 0));
        assert_eq!(split(POSITION_SP, 500, 100).unwrap(), (500, -500));
        assert_eq!(split(POSITION_SP, 500, -25).unwrap(), (250, 500));
        assert!(matches!(
            split(POSITION_SP, 500, 101),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_split_rejects_counts_beyond_32_bits() {
        let max = i64::from(i32::MAX);
        assert_eq!(split(POSITION_SP, max, 30).unwrap().0, max);
        assert!(matches!(
            split(POSITION_SP, i64::MAX / 10, 30),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            split(POSITION_SP, max + 1, 0),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_oversized_counts_leave_motors_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let (left, right) = pair(tmp.path());
        let mut steering = Steering::new(left, right).unwrap();

        assert!(steering.steer_counts(400, 30, i64::MAX / 10).is_err());
        assert_eq!(read(tmp.path(), "motor0", "command"), "\n");
        assert_eq!(read(tmp.path(), "motor1", "speed_sp"), "0\n");
    }

    #[test]
    fn test_steer_counts_writes_both_motors() {
        let tmp = tempfile::tempdir().unwrap();
        let (left, right) = pair(tmp.path());
        let mut steering = Steering::new(left, right).unwrap();

        steering.steer_counts(400, 25, 720).unwrap();

        assert_eq!(read(tmp.path(), "motor0", "speed_sp"), "400\n");
        assert_eq!(read(tmp.path(), "motor0", "position_sp"), "720\n");
        assert_eq!(read(tmp.path(), "motor0", "command"), RUN_TO_REL_POS);
        assert_eq!(read(tmp.path(), "motor1", "speed_sp"), "200\n");
        assert_eq!(read(tmp.path(), "motor1", "position_sp"), "360\n");
        assert_eq!(read(tmp.path(), "motor1", "command"), RUN_TO_REL_POS);
    }

    #[test]
    fn test_steer_duration() {
        let tmp = tempfile::tempdir().unwrap();
        let (left, right) = pair(tmp.path());
        let mut steering = Steering::new(left, right).unwrap();

        steering
            .steer_duration(300, -50, Duration::from_millis(1500))
            .unwrap();

        assert_eq!(read(tmp.path(), "motor0", "speed_sp"), "0\n");
        assert_eq!(read(tmp.path(), "motor1", "speed_sp"), "300\n");
        assert_eq!(read(tmp.path(), "motor0", "time_sp"), "1500\n");
        assert_eq!(read(tmp.path(), "motor1", "command"), RUN_TIMED);
    }

    #[test]
    fn test_bad_turn_leaves_motors_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let (left, right) = pair(tmp.path());
        let mut steering = Steering::new(left, right).unwrap();

        assert!(steering.steer_counts(400, -150, 720).is_err());
        assert_eq!(read(tmp.path(), "motor0", "command"), "\n");
    }

    #[test]
    fn test_stop_actions_must_agree() {
        let tmp = tempfile::tempdir().unwrap();
        let (left, right) = pair(tmp.path());
        fs::write(
            tmp.path().join("tacho-motor/motor1/stop_actions"),
            "coast brake\n",
        )
        .unwrap();

        match Steering::new(left, right) {
            Err(Error::ActionsMismatch { left, right }) => {
                assert_eq!(left, ["coast", "brake", "hold"]);
                assert_eq!(right, ["coast", "brake"]);
            }
            other => panic!("expected ActionsMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_stop_action_mismatch_and_repair() {
        let tmp = tempfile::tempdir().unwrap();
        let (left, right) = pair(tmp.path());
        let mut steering = Steering::new(left, right).unwrap();
        fs::write(tmp.path().join("tacho-motor/motor0/stop_action"), "hold\n").unwrap();

        assert!(matches!(
            steering.stop_action(),
            Err(Error::ActionMismatch { .. })
        ));

        steering.set_stop_action("brake").unwrap();
        assert_eq!(steering.stop_action().unwrap(), "brake");

        steering.stop().unwrap();
        assert_eq!(read(tmp.path(), "motor1", "command"), STOP);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_both() {
        let tmp = tempfile::tempdir().unwrap();
        let (left, right) = pair(tmp.path());
        let steering = Steering::new(left, right).unwrap();

        let (l, r) = steering.wait(Some(Duration::from_secs(1))).await.unwrap();
        assert!(l.is_empty() && r.is_empty());

        fs::write(tmp.path().join("tacho-motor/motor1/state"), "running\n").unwrap();
        match steering.wait(Some(Duration::from_millis(200))).await {
            Err(Error::Timeout { state }) => assert_eq!(state, MotorState::RUNNING),
            other => panic!("expected Timeout, got {other:?}"),
        }
    }
}
