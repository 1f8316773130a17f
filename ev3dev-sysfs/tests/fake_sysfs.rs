//! Drive a fake class tree end to end: locate, configure, run, and wait for
//! the "kernel" (a background task) to finish the move.

use std::{fs, path::Path, time::Duration};

use ev3dev_sysfs::{
    Config, DeviceClass, Error, ErrorSink, Locator, MotorState, Sensor, TachoMotor, WaitRequest,
};

fn write_attrs(dir: &Path, attrs: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (attr, value) in attrs {
        fs::write(dir.join(attr), format!("{value}\n")).unwrap();
    }
}

fn build_tree(root: &Path) {
    let motors = root.join("tacho-motor");
    for (name, address) in [("motor0", "ev3-ports:outA"), ("motor1", "ev3-ports:outB")] {
        write_attrs(
            &motors.join(name),
            &[
                ("address", address),
                ("driver_name", "lego-ev3-l-motor"),
                ("commands", "run-forever run-to-rel-pos run-timed stop reset"),
                ("command", ""),
                ("speed_sp", "0"),
                ("position_sp", "0"),
                ("ramp_up_sp", "0"),
                ("stop_action", "coast"),
                ("stop_actions", "coast brake hold"),
                ("state", ""),
            ],
        );
    }
    write_attrs(
        &root.join("lego-sensor").join("sensor0"),
        &[
            ("address", "ev3-ports:in1"),
            ("driver_name", "lego-ev3-touch"),
            ("modes", "TOUCH"),
            ("mode", "TOUCH"),
            ("num_values", "1"),
            ("decimals", "0"),
            ("value0", "1"),
        ],
    );
}

fn locator(root: &Path) -> Locator {
    Locator::from_config(&Config {
        sysfs_root: root.to_path_buf(),
        poll_interval: Duration::from_millis(10),
    })
}

#[tokio::test]
async fn test_run_and_wait_for_hold() {
    let tmp = tempfile::tempdir().unwrap();
    build_tree(tmp.path());
    let locator = locator(tmp.path());

    let mut motor = TachoMotor::resolve(&locator, "ev3-ports:outB", "lego-ev3-l-motor")
        .unwrap()
        .strict()
        .unwrap();
    assert_eq!(motor.device().name(), "motor1");

    motor
        .set_speed_sp(500)
        .set_position_sp(360)
        .set_ramp_up_sp(Duration::from_millis(200))
        .set_stop_action("hold")
        .command("run-to-rel-pos");
    motor.err().unwrap();

    let dir = motor.device().dir().to_path_buf();
    assert_eq!(fs::read_to_string(dir.join("command")).unwrap(), "run-to-rel-pos");
    assert_eq!(fs::read_to_string(dir.join("speed_sp")).unwrap(), "500\n");
    fs::write(dir.join("state"), "running ramping\n").unwrap();

    let state_path = dir.join("state");
    let kernel = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&state_path, "running\n").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(&state_path, "holding\n").unwrap();
    });

    let outcome = motor
        .wait(&WaitRequest::stopped().with_timeout(Duration::from_secs(5)))
        .await
        .unwrap();
    assert!(outcome.satisfied);
    assert_eq!(outcome.state, MotorState::HOLDING);
    kernel.await.unwrap();

    assert_eq!(motor.state().unwrap(), MotorState::HOLDING);
}

#[tokio::test]
async fn test_wait_times_out_on_busy_motor() {
    let tmp = tempfile::tempdir().unwrap();
    build_tree(tmp.path());
    fs::write(tmp.path().join("tacho-motor/motor0/state"), "running stalled\n").unwrap();
    let locator = locator(tmp.path());

    let motor = TachoMotor::resolve(&locator, "", "lego-ev3-l-motor")
        .unwrap()
        .strict()
        .unwrap();

    let err = motor
        .wait(&WaitRequest::stopped().with_timeout(Duration::from_millis(50)))
        .await
        .unwrap()
        .into_result()
        .unwrap_err();
    match err {
        Error::Timeout { state } => {
            assert_eq!(state, MotorState::RUNNING | MotorState::STALLED)
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
}

#[test]
fn test_invalid_setpoint_never_reaches_device() {
    let tmp = tempfile::tempdir().unwrap();
    build_tree(tmp.path());
    let locator = locator(tmp.path());

    let mut motor = TachoMotor::resolve(&locator, "ev3-ports:outA", "")
        .unwrap()
        .strict()
        .unwrap();
    motor
        .set_ramp_up_sp(Duration::from_secs(61))
        .set_speed_sp(900)
        .command("run-forever");

    assert!(matches!(motor.err(), Err(Error::Validation { .. })));
    let dir = motor.device().dir();
    assert_eq!(fs::read_to_string(dir.join("ramp_up_sp")).unwrap(), "0\n");
    assert_eq!(fs::read_to_string(dir.join("speed_sp")).unwrap(), "0\n");
    assert_eq!(fs::read_to_string(dir.join("command")).unwrap(), "\n");
}

#[test]
fn test_sensor_at_port_and_listing() {
    let tmp = tempfile::tempdir().unwrap();
    build_tree(tmp.path());
    let locator = locator(tmp.path());

    let mut touch = Sensor::resolve(&locator, "ev3-ports:in1", "lego-ev3-touch")
        .unwrap()
        .strict()
        .unwrap();
    assert_eq!(touch.scaled_value(0).unwrap(), 1.0);

    let names: Vec<_> = locator
        .list(DeviceClass::TachoMotor)
        .unwrap()
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    assert_eq!(names, ["motor0", "motor1"]);

    assert!(matches!(
        TachoMotor::resolve(&locator, "ev3-ports:outD", "lego-ev3-l-motor"),
        Err(Error::NotFound { .. })
    ));
}
