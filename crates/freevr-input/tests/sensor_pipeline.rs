//! Integration tests for the 6-sensor calibration pipeline as seen through
//! configured devices and users.

use freevr_common::{DeviceConfig, InputConfig, InputDecl, TransformConfig};
use freevr_input::{
    Axis, ConvFlags, DriverRegistry, InputContext, InputType, Matrix, Point3, Sensor6Conv,
    UserSelect,
};

fn close(a: &Matrix, b: &Matrix) -> bool {
    a.abs_diff_eq(b, 1e-9)
}

fn tracked() -> InputConfig {
    InputConfig {
        devices: vec![DeviceConfig {
            name: "tracker".to_string(),
            driver: "static".to_string(),
            args: "y=1.5".to_string(),
            t2rw: Some(TransformConfig {
                translate: [0.0, 0.0, 0.0],
                rotate: [90.0, 0.0, 0.0],
            }),
            inputs: vec![
                InputDecl {
                    name: "head".to_string(),
                    desc: "6sensor(tracker:constant[id])".to_string(),
                    ..InputDecl::default()
                },
                InputDecl {
                    name: "wand".to_string(),
                    desc: "6sensor(tracker:constant[id,r2e])".to_string(),
                    r2e: Some(TransformConfig {
                        translate: [0.0, 0.0, -0.5],
                        rotate: [0.0; 3],
                    }),
                    ..InputDecl::default()
                },
            ],
            ..DeviceConfig::default()
        }],
        ..InputConfig::default()
    }
}

#[test]
fn t2rw_pre_multiplies_the_raw_pose() {
    let ctx = InputContext::bring_up(tracked(), &DriverRegistry::with_builtin()).unwrap();
    let head = ctx.get_from_type_index(InputType::Sensor6, 0).unwrap();
    let t2rw = Matrix::rotation(Axis::Y, 90.0);
    assert!(close(&head.sensor6_t2rw(), &t2rw));

    head.assign_sensor6(&Matrix::IDENTITY, 0).unwrap();
    assert!(close(&head.sensor6_matrix_no_last_update(), &t2rw));
}

#[test]
fn r2e_offsets_in_the_calibrated_frame() {
    let ctx = InputContext::bring_up(tracked(), &DriverRegistry::with_builtin()).unwrap();
    let wand = ctx.get_from_type_index(InputType::Sensor6, 1).unwrap();
    wand.assign_sensor6(&Matrix::IDENTITY, 0).unwrap();

    let mut expected = Matrix::rotation(Axis::Y, 90.0);
    expected.post_translate(0.0, 0.0, -0.5);
    assert!(close(&wand.sensor6_matrix_no_last_update(), &expected));

    // rotated 90 degrees about Y, local -Z points along world -X
    let t = wand.sensor6_matrix_no_last_update().translation_part();
    assert!((t[0] + 0.5).abs() < 1e-9);
    assert!(t[2].abs() < 1e-9);
}

#[test]
fn restricted_space_clamps_into_the_working_volume() {
    let ctx = InputContext::bring_up(InputConfig::default(), &DriverRegistry::new()).unwrap();
    let sensor = ctx.get_from_type_index(InputType::Sensor6, 0).unwrap();
    sensor.assign_sensor6(&Matrix::translation(0.0, 5.0, 0.0), 1).unwrap();

    let conv = Sensor6Conv::default().with_flags(ConvFlags::RESTRICT_SPACE);
    sensor
        .assign_sensor6_from_valuators(&[12.0, 0.0, 0.0, 0.0, 0.0, 0.0], &conv, -1)
        .unwrap();

    assert_eq!(sensor.sensor6_matrix_no_last_update().translation_part()[0], 5.0);
    assert_eq!(sensor.sensor6_oob(), Some(0));
}

#[test]
fn users_see_sensors_through_their_travel() {
    let ctx = InputContext::bring_up(tracked(), &DriverRegistry::with_builtin()).unwrap();
    let wand = ctx.get_from_type_index(InputType::Sensor6, 1).unwrap();
    wand.assign_sensor6(&Matrix::IDENTITY, 0).unwrap();

    let rw = ctx.point_rw_from_sensor6(1);
    ctx.travel_translate(UserSelect::All, 10.0, 0.0, 0.0).unwrap();
    let vw = ctx.point_vw_from_user_sensor6(0, 1);
    assert!((vw.x - (rw.x + 10.0)).abs() < 1e-9);
    assert_eq!(ctx.rw_from_vw_point(0, &Point3::new(10.0, 0.0, 0.0)), Point3::default());
}
