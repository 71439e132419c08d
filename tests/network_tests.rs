//! Integration tests for radio bring-up and attachment

use std::cell::Cell;

use button_gateway::{
    LinkEvent, LinkListener, Modem, NetworkAttachment, RadioMode, RegistrationStatus,
    StartupError, configure_modem,
};
use embassy_futures::block_on;
use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Timer, with_timeout};

type Attachment = NetworkAttachment<CriticalSectionRawMutex>;

#[derive(Debug, PartialEq)]
enum FakeModemError {
    PoweredOff,
    Rejected,
}

/// Replays a fixed event sequence into the listener as soon as registration
/// is requested.
#[derive(Default)]
struct FakeModem {
    init_fails: bool,
    connect_fails: bool,
    initialized: Cell<bool>,
    events: Vec<LinkEvent>,
}

impl Modem for FakeModem {
    type Error = FakeModemError;

    async fn init(&mut self) -> Result<(), Self::Error> {
        if self.init_fails {
            return Err(FakeModemError::PoweredOff);
        }
        self.initialized.set(true);
        Ok(())
    }

    async fn connect_async(
        &mut self,
        listener: &'static (dyn LinkListener + Sync),
    ) -> Result<(), Self::Error> {
        assert!(self.initialized.get(), "registration before init");
        if self.connect_fails {
            return Err(FakeModemError::Rejected);
        }
        for event in self.events.drain(..) {
            listener.on_event(event);
        }
        Ok(())
    }
}

fn attachment() -> &'static Attachment {
    Box::leak(Box::new(Attachment::new()))
}

#[test]
fn init_failure_is_fatal() {
    let attachment = attachment();
    let mut modem = FakeModem {
        init_fails: true,
        ..Default::default()
    };

    let result = block_on(configure_modem(&mut modem, attachment));

    assert_eq!(result, Err(StartupError::RadioInit));
    assert!(!attachment.is_attached());
}

#[test]
fn registration_request_failure_is_fatal() {
    let attachment = attachment();
    let mut modem = FakeModem {
        connect_fails: true,
        ..Default::default()
    };

    let result = block_on(configure_modem(&mut modem, attachment));

    assert_eq!(result, Err(StartupError::Registration));
}

#[test]
fn registered_home_attaches() {
    let attachment = attachment();
    let mut modem = FakeModem {
        events: vec![
            LinkEvent::RegistrationStatus(RegistrationStatus::Searching),
            LinkEvent::RadioModeChanged(RadioMode::Connected),
            LinkEvent::RegistrationStatus(RegistrationStatus::RegisteredHome),
        ],
        ..Default::default()
    };

    block_on(configure_modem(&mut modem, attachment)).unwrap();

    assert!(attachment.is_attached());
    block_on(attachment.wait_attached());
}

#[test]
fn unregistered_statuses_keep_waiting() {
    let attachment = attachment();
    let mut modem = FakeModem {
        events: vec![
            LinkEvent::RegistrationStatus(RegistrationStatus::Searching),
            LinkEvent::RegistrationStatus(RegistrationStatus::RegistrationDenied),
            LinkEvent::RegistrationStatus(RegistrationStatus::Unknown),
            LinkEvent::RadioModeChanged(RadioMode::Idle),
            LinkEvent::Other,
        ],
        ..Default::default()
    };

    block_on(configure_modem(&mut modem, attachment)).unwrap();

    assert!(!attachment.is_attached());
    let waited = block_on(with_timeout(
        Duration::from_millis(20),
        attachment.wait_attached(),
    ));
    assert!(waited.is_err());
}

#[test]
fn waiter_wakes_on_late_registration() {
    let attachment = attachment();

    let registrar = async {
        Timer::after(Duration::from_millis(10)).await;
        attachment.on_event(LinkEvent::RegistrationStatus(
            RegistrationStatus::RegisteredRoaming,
        ));
        // redundant events after the first are no-ops
        attachment.on_event(LinkEvent::RegistrationStatus(
            RegistrationStatus::RegisteredHome,
        ));
        Timer::after(Duration::from_secs(5)).await;
    };

    let outcome = block_on(select(attachment.wait_attached(), registrar));

    assert!(matches!(outcome, Either::First(())));
    assert!(attachment.is_attached());
    // the gate stays open for later waiters
    block_on(attachment.wait_attached());
}
