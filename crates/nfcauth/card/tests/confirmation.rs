//! User-facing flows working against the engine through the shared state

use std::{sync::Arc, thread, time::Duration};

use crossbeam_channel::{bounded, never};
use nfcauth_apdu_core::status;
use nfcauth_card::{
    ApduProtocolEngine, AuthGate, BiometricConfirmation, ConfirmationOutcome, Error, ManualClock,
    MemoryPendingStore, MemoryRegistry, NoopNotifier, PendingRegistrationStore,
    RegistrationConfirmation, Registry, SigningService, SoftwareSigner, constants::headers,
};

const FAST_POLL: Duration = Duration::from_millis(5);

struct Setup {
    pending: Arc<MemoryPendingStore>,
    registry: Arc<MemoryRegistry>,
    signer: Arc<SoftwareSigner>,
}

impl Setup {
    fn new() -> Self {
        Self {
            pending: Arc::new(MemoryPendingStore::new()),
            registry: Arc::new(MemoryRegistry::new()),
            signer: Arc::new(SoftwareSigner::generate()),
        }
    }

    fn confirmation(&self, reader_id: &str) -> RegistrationConfirmation {
        RegistrationConfirmation::new(
            self.pending.clone(),
            self.signer.clone(),
            reader_id,
            "Front Door",
        )
        .with_poll_interval(FAST_POLL)
    }

    fn engine(&self) -> ApduProtocolEngine {
        ApduProtocolEngine::new(
            Arc::new(AuthGate::default()),
            self.pending.clone(),
            self.registry.clone(),
            self.signer.clone(),
            Arc::new(NoopNotifier),
        )
    }
}

#[test]
fn confirm_stages_record_with_card_key() {
    let setup = Setup::new();
    let flow = setup.confirmation("r1");

    assert!(matches!(flow.confirm("  "), Err(Error::InvalidInput(_))));
    assert!(!setup.pending.exists().unwrap());

    let record = flow.confirm(" Alex ").unwrap();
    assert_eq!(record.user_name, "Alex");
    assert_eq!(record.user_id, flow.user_id());
    assert_eq!(record.public_key, setup.signer.public_key().unwrap());
    assert_eq!(setup.pending.get().unwrap(), Some(record));

    // Each flow presents a distinct user id
    assert_ne!(setup.confirmation("r1").user_id(), flow.user_id());
}

#[test]
fn wait_ends_when_reader_completes() {
    let setup = Setup::new();
    let flow = setup.confirmation("r1");
    flow.confirm("Alex").unwrap();

    let mut engine = setup.engine();
    let reader = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        engine.handle(&headers::REGISTER_COMPLETE)
    });

    assert_eq!(
        flow.wait_until_consumed(&never()).unwrap(),
        ConfirmationOutcome::Consumed
    );
    assert_eq!(&reader.join().unwrap()[..], &status::SUCCESS.to_bytes()[..]);
    assert_eq!(setup.registry.get("r1").unwrap().unwrap().user_id, flow.user_id());
}

#[test]
fn wait_times_out_and_withdraws_record() {
    let setup = Setup::new();
    let flow = setup
        .confirmation("r1")
        .with_timeout(Duration::from_millis(40));
    flow.confirm("Alex").unwrap();

    assert_eq!(
        flow.wait_until_consumed(&never()).unwrap(),
        ConfirmationOutcome::TimedOut
    );
    assert!(!setup.pending.exists().unwrap());

    // The reader now finds nothing to complete
    let mut engine = setup.engine();
    assert_eq!(
        &engine.handle(&headers::REGISTER_COMPLETE)[..],
        &status::GENERIC_ERROR.to_bytes()[..]
    );
}

#[test]
fn wait_can_be_cancelled() {
    let setup = Setup::new();
    let flow = setup.confirmation("r1");
    flow.confirm("Alex").unwrap();

    let (cancel_tx, cancel_rx) = bounded(1);
    cancel_tx.send(()).unwrap();
    assert_eq!(
        flow.wait_until_consumed(&cancel_rx).unwrap(),
        ConfirmationOutcome::Cancelled
    );
    assert!(!setup.pending.exists().unwrap());

    // A dropped sender cancels too
    flow.confirm("Alex").unwrap();
    let (cancel_tx, cancel_rx) = bounded::<()>(1);
    drop(cancel_tx);
    assert_eq!(
        flow.wait_until_consumed(&cancel_rx).unwrap(),
        ConfirmationOutcome::Cancelled
    );
}

#[test]
fn newer_registration_supersedes_and_survives() {
    let setup = Setup::new();
    let first = setup.confirmation("r1");
    first.confirm("Alex").unwrap();

    let second = setup.confirmation("r2");
    let record = second.confirm("Alex").unwrap();

    assert_eq!(
        first.wait_until_consumed(&never()).unwrap(),
        ConfirmationOutcome::Superseded
    );
    first.abandon().unwrap();
    assert_eq!(setup.pending.get().unwrap(), Some(record));

    second.abandon().unwrap();
    assert!(!setup.pending.exists().unwrap());
}

#[test]
fn biometric_results_drive_gate() {
    let clock = Arc::new(ManualClock::new(Duration::from_secs(100)));
    let gate = Arc::new(AuthGate::new(clock));
    let prompt = BiometricConfirmation::new(gate.clone());

    prompt.succeeded(2);
    assert!(gate.is_authenticated());
    assert_eq!(gate.snapshot().auth_type, 2);

    prompt.failed();
    assert!(!gate.is_authenticated());

    prompt.succeeded(1);
    prompt.cancelled();
    assert!(!gate.is_authenticated());
}
