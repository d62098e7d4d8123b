//! Integration tests for service provisioning.
//!
//! Drives the registry with the confirmation sequence the stack sends and
//! checks the requests it issues in reply, including the failure paths.

use iotdisplay::app::events::AppEvent;
use iotdisplay::gatt::provisioner::{ProvisionFailure, ProvisionState};
use iotdisplay::gatt::{
    GapEvent, GattStatus, GattsEvent, InterfaceId, StackEvent, COLOR_CHAR_UUID, SERVICE_UUID,
    TEXT_CHAR_UUID,
};

use crate::mock_hw::{
    setup_sequence, LinkCall, Rig, COLOR_HANDLE, IFACE, SERVICE_HANDLE, TEXT_HANDLE,
};

#[test]
fn full_setup_reaches_ready_and_records_handles() {
    let rig = Rig::ready();

    assert_eq!(rig.registry.state(rig.app_id), Some(ProvisionState::Ready));
    let profile = rig.registry.profile(rig.app_id).unwrap();
    assert_eq!(profile.interface, Some(IFACE));
    assert_eq!(profile.service_handle, Some(SERVICE_HANDLE));
    assert_eq!(profile.color_handle, Some(COLOR_HANDLE));
    assert_eq!(profile.text_handle, Some(TEXT_HANDLE));
    assert!(rig.registry.is_settled());

    assert!(rig.sink.events.contains(&AppEvent::ProvisioningComplete {
        app_id: rig.app_id,
        service_handle: SERVICE_HANDLE,
        color_handle: COLOR_HANDLE,
        text_handle: TEXT_HANDLE,
    }));
    assert!(rig.sink.events.contains(&AppEvent::AdvertisingStarted));
    assert!(rig.registry.advertising().is_active());
}

#[test]
fn requests_are_issued_in_dependency_order() {
    let rig = Rig::ready();
    let calls = &rig.link.calls;

    assert_eq!(calls[0], LinkCall::RegisterApp(rig.app_id));
    assert_eq!(calls[1], LinkCall::SetLocalMtu(500));

    let pos = |want: &LinkCall| calls.iter().position(|c| c == want).unwrap();
    let name = pos(&LinkCall::SetDeviceName("ESP32_IoT_Display".into()));
    let adv_data = pos(&LinkCall::ConfigureAdvData);
    let create = pos(&LinkCall::CreateService {
        interface: IFACE,
        uuid: SERVICE_UUID,
        num_handles: 8,
    });
    let start = pos(&LinkCall::StartService(SERVICE_HANDLE));
    let color = pos(&LinkCall::AddCharacteristic {
        service_handle: SERVICE_HANDLE,
        uuid: COLOR_CHAR_UUID,
    });
    let text = pos(&LinkCall::AddCharacteristic {
        service_handle: SERVICE_HANDLE,
        uuid: TEXT_CHAR_UUID,
    });
    let adv = pos(&LinkCall::StartAdvertising);

    assert!(name < adv_data && adv_data < create);
    assert!(create < start && start < color && color < text);
    // Advertising starts from the payload confirmation, never before.
    assert!(text < adv);
    assert_eq!(rig.link.advertising_requests(), 1);
}

#[test]
fn advertising_waits_for_payload_confirmation() {
    let mut rig = Rig::new();
    rig.registry.register(rig.app_id, &mut rig.link, 0).unwrap();
    for event in setup_sequence(rig.app_id) {
        rig.feed(event);
    }
    assert_eq!(rig.link.advertising_requests(), 0);
    assert!(rig.registry.advertising().is_data_pending());

    rig.feed(StackEvent::Gap(GapEvent::AdvDataSet {
        status: GattStatus::Ok,
    }));
    assert_eq!(rig.link.advertising_requests(), 1);
    assert!(!rig.registry.advertising().is_data_pending());
}

#[test]
fn out_of_order_confirmation_does_not_advance() {
    let mut rig = Rig::new();
    rig.registry.register(rig.app_id, &mut rig.link, 0).unwrap();
    let seq = setup_sequence(rig.app_id);
    rig.feed(seq[0].clone());

    // Colour characteristic confirmed before the service exists.
    rig.feed(seq[3].clone());
    assert_eq!(rig.registry.state(rig.app_id), Some(ProvisionState::Registered));
    assert_eq!(rig.registry.profile(rig.app_id).unwrap().color_handle, None);

    // Text before colour is also refused.
    rig.feed(seq[1].clone());
    rig.feed(seq[4].clone());
    assert_eq!(rig.registry.state(rig.app_id), Some(ProvisionState::ServiceCreated));
    assert_eq!(rig.registry.profile(rig.app_id).unwrap().text_handle, None);

    rig.feed(seq[3].clone());
    rig.feed(seq[4].clone());
    assert_eq!(rig.registry.state(rig.app_id), Some(ProvisionState::Ready));
}

#[test]
fn failure_status_moves_to_failed() {
    let mut rig = Rig::new();
    rig.registry.register(rig.app_id, &mut rig.link, 0).unwrap();
    rig.feed(StackEvent::Gatts {
        interface: IFACE,
        event: GattsEvent::Registered {
            status: GattStatus::Error,
            app_id: rig.app_id,
        },
    });

    assert_eq!(rig.registry.state(rig.app_id), Some(ProvisionState::Failed));
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::ProvisioningFailed {
            reason: ProvisionFailure::Rejected {
                state: ProvisionState::Unregistered,
                status: 0x85
            },
            ..
        }
    )));
    assert!(!rig
        .link
        .calls
        .iter()
        .any(|c| matches!(c, LinkCall::CreateService { .. })));
}

#[test]
fn refused_request_moves_to_failed() {
    let mut rig = Rig::new();
    rig.link.refuse = Some("create_service");
    rig.registry.register(rig.app_id, &mut rig.link, 0).unwrap();
    rig.feed(setup_sequence(rig.app_id)[0].clone());

    assert_eq!(rig.registry.state(rig.app_id), Some(ProvisionState::Failed));
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::ProvisioningFailed {
            reason: ProvisionFailure::Request(_),
            ..
        }
    )));
}

#[test]
fn refused_registration_is_returned_to_caller() {
    let mut rig = Rig::new();
    rig.link.refuse = Some("register_app");
    let err = rig.registry.register(rig.app_id, &mut rig.link, 0).unwrap_err();
    assert_eq!(err.op, "register_app");
}

#[test]
fn rejected_local_mtu_is_not_fatal() {
    let mut rig = Rig::new();
    rig.link.refuse = Some("set_local_mtu");
    assert!(rig.registry.register(rig.app_id, &mut rig.link, 0).is_ok());
    for event in setup_sequence(rig.app_id) {
        rig.feed(event);
    }
    assert_eq!(rig.registry.state(rig.app_id), Some(ProvisionState::Ready));
}

#[test]
fn deadline_fails_unfinished_provisioning() {
    let mut rig = Rig::new();
    rig.registry.register(rig.app_id, &mut rig.link, 1_000).unwrap();
    rig.feed(setup_sequence(rig.app_id)[0].clone());

    rig.registry.poll_deadlines(10_999, &mut rig.sink);
    assert_eq!(rig.registry.state(rig.app_id), Some(ProvisionState::Registered));

    rig.registry.poll_deadlines(11_000, &mut rig.sink);
    assert_eq!(rig.registry.state(rig.app_id), Some(ProvisionState::Failed));
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::ProvisioningFailed {
            reason: ProvisionFailure::DeadlineExpired {
                state: ProvisionState::Registered
            },
            ..
        }
    )));

    // Late confirmations after the deadline change nothing.
    for event in setup_sequence(rig.app_id).into_iter().skip(1) {
        rig.feed(event);
    }
    assert_eq!(rig.registry.state(rig.app_id), Some(ProvisionState::Failed));
}

#[test]
fn deadline_never_fires_once_ready() {
    let mut rig = Rig::ready();
    rig.registry.poll_deadlines(u64::MAX, &mut rig.sink);
    assert_eq!(rig.registry.state(rig.app_id), Some(ProvisionState::Ready));
}

#[test]
fn events_for_other_interfaces_are_ignored() {
    let mut rig = Rig::new();
    rig.registry.register(rig.app_id, &mut rig.link, 0).unwrap();
    rig.feed(setup_sequence(rig.app_id)[0].clone());
    rig.feed(StackEvent::Gatts {
        interface: InterfaceId(9),
        event: GattsEvent::ServiceCreated {
            status: GattStatus::Ok,
            service_handle: 77,
            uuid: SERVICE_UUID,
        },
    });
    assert_eq!(rig.registry.state(rig.app_id), Some(ProvisionState::Registered));
}

#[test]
fn registering_twice_is_a_no_op() {
    let mut rig = Rig::new();
    rig.registry.register(rig.app_id, &mut rig.link, 0).unwrap();
    rig.registry.register(rig.app_id, &mut rig.link, 0).unwrap();
    assert_eq!(
        rig.link.count(|c| matches!(c, LinkCall::RegisterApp(_))),
        1
    );
}
