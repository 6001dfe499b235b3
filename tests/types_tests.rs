use htcc::{ControlChange, FanMode, HoldType, HoldUntil, SetpointBounds, SystemMode};

#[test]
fn mode_names_round_trip_through_display() {
    for mode in SystemMode::ALL {
        assert_eq!(mode.to_string().parse::<SystemMode>().unwrap(), mode);
    }
    assert_eq!("emergency_heat".parse::<SystemMode>().unwrap(), SystemMode::EmergencyHeat);
    assert_eq!("schedule".parse::<FanMode>().unwrap(), FanMode::Schedule);
}

#[test]
fn unknown_mode_name_is_rejected() {
    let err = "turbo".parse::<FanMode>().unwrap_err();
    assert_eq!(
        err.to_string(),
        "unknown fan mode: turbo. Allowed: [\"auto\", \"on\", \"circulate\", \"schedule\"]"
    );
}

#[test]
fn hold_until_parses_quarter_hours() {
    let t: HoldUntil = "18:45".parse().unwrap();
    assert_eq!((t.hour(), t.minute()), (18, 45));
    assert_eq!(t.slot(), 75);
    assert!("18:40".parse::<HoldUntil>().is_err());
    assert!("24:00".parse::<HoldUntil>().is_err());
}

#[test]
fn bounds_are_inclusive() {
    let bounds = SetpointBounds {
        min_heat: 40.0,
        max_heat: 90.0,
        min_cool: 50.0,
        max_cool: 99.0,
    };
    assert!(bounds.check_heat(40.0).is_ok());
    assert!(bounds.check_heat(90.0).is_ok());
    assert!(bounds.check_heat(90.5).is_err());
    assert!(bounds.check_cool(49.5).is_err());
    assert!(bounds.check_cool(f64::NAN).is_err());
    assert!(bounds.check_heat(f64::NAN).is_err());
}

#[test]
fn control_change_payload_is_public() {
    let change = ControlChange {
        hold: Some(HoldType::Permanent),
        ..Default::default()
    };
    let payload = change.to_payload(7).unwrap();
    assert_eq!(payload["DeviceID"], 7);
    assert_eq!(payload["StatusHeat"], 2);
    assert_eq!(payload["StatusCool"], 2);
    assert!(payload["SystemSwitch"].is_null());
}
