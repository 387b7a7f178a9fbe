//! End-to-end run of the registration and authentication handshakes
//!
//! The card state lives under the configured data directory, so a second run
//! authenticates straight away with the registration made by the first.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Instant,
};

use crossbeam_channel::{Receiver, bounded};
use eyre::{bail, eyre};
use nfcauth_card::{
    ApduProtocolEngine, AuthGate, AuthMode, BiometricConfirmation, ChannelNotifier,
    ConfirmationConfig, FilePendingStore, JsonFileRegistry, PendingRegistrationStore,
    RegistrationConfirmation, SoftwareSigner, UiEvent, VirtualCard,
};
use nfcauth_reader::{AuthOutcome, Enrollments, ReaderClient};
use tracing::{debug, info, trace, warn};

use crate::config::Settings;

/// Reader-side enrollments kept next to the card state
const ENROLLMENTS_FILE: &str = "enrollments.json";
/// Retries of a biometric-gated authentication before giving up
const BIOMETRIC_RETRIES: usize = 3;
/// Confirmation kind reported for a passed biometric prompt
const AUTH_TYPE_BIOMETRIC: u8 = 2;

/// Run a reader against an emulated card with a simulated user
pub(crate) fn simulate_command(
    settings: &Settings,
    user_name: &str,
    auth: Option<AuthMode>,
    deny_biometric: bool,
) -> eyre::Result<()> {
    let card = &settings.card;
    card.ensure_data_dir()?;

    let signer = Arc::new(SoftwareSigner::load_or_generate(card.key_path())?);
    let registry = Arc::new(JsonFileRegistry::open(card.registry_path())?);
    let pending = Arc::new(FilePendingStore::new(card.pending_path()));
    let gate = Arc::new(AuthGate::default());
    let (notifier, events) = ChannelNotifier::new();

    let engine = ApduProtocolEngine::new(
        gate.clone(),
        pending.clone(),
        registry,
        signer.clone(),
        Arc::new(notifier),
    );

    let phone = Phone {
        pending,
        signer,
        gate,
        user_name: user_name.to_string(),
        deny_biometric,
        timing: card.confirmation,
    };
    let (stop_tx, stop_rx) = bounded::<()>(0);
    let phone_thread = thread::spawn(move || phone.run(&events, &stop_rx));

    let enrollments_path = card.data_dir.join(ENROLLMENTS_FILE);
    let enrollments = Enrollments::load(&enrollments_path)?;
    let mut client = ReaderClient::new(VirtualCard::new(engine), settings.reader.clone())
        .with_enrollments(enrollments);
    let mode = auth.unwrap_or(settings.reader.auth);

    let result = run_reader(&mut client, mode, card.confirmation);

    // Dropping the card closes the UI channel, dropping the sender cancels
    // any registration hand-off still waiting
    let (transport, enrollments) = client.into_parts();
    drop(transport);
    drop(stop_tx);
    phone_thread
        .join()
        .map_err(|_| eyre!("simulated user panicked"))?;

    enrollments.save(&enrollments_path)?;
    result
}

fn run_reader(
    client: &mut ReaderClient<VirtualCard>,
    mode: AuthMode,
    timing: ConfirmationConfig,
) -> eyre::Result<()> {
    client.select_application()?;
    println!("Selected nfcauth application");

    let mut outcome = if client.enrollments().is_empty() {
        debug!("No users enrolled on this reader");
        AuthOutcome::NotRegistered
    } else {
        authenticate(client, mode, timing)?
    };
    if outcome == AuthOutcome::NotRegistered {
        register(client, timing)?;
        outcome = authenticate(client, mode, timing)?;
    }

    match outcome {
        AuthOutcome::Authenticated { user_id, user_name } => {
            println!("Authenticated {user_name} ({user_id}) in {} mode", mode.as_str());
            Ok(())
        }
        AuthOutcome::BiometricRequired => bail!("biometric confirmation was not given"),
        AuthOutcome::NotRegistered => bail!("card did not keep the registration"),
    }
}

fn register(client: &mut ReaderClient<VirtualCard>, timing: ConfirmationConfig) -> eyre::Result<()> {
    let deadline = Instant::now() + timing.timeout();
    let enrollment = loop {
        if let Some(enrollment) = client.request_registration()? {
            break enrollment;
        }
        if Instant::now() >= deadline {
            client.notify_not_registered()?;
            bail!("registration was not confirmed in time");
        }
        thread::sleep(timing.poll_interval());
    };

    client.complete_registration()?;
    println!(
        "Registered {} ({}) with reader {}",
        enrollment.user_name,
        enrollment.user_id,
        client.config().reader_id
    );
    Ok(())
}

fn authenticate(
    client: &mut ReaderClient<VirtualCard>,
    mode: AuthMode,
    timing: ConfirmationConfig,
) -> eyre::Result<AuthOutcome> {
    let mut outcome = client.authenticate(mode)?;
    for _ in 0..BIOMETRIC_RETRIES {
        if outcome != AuthOutcome::BiometricRequired {
            break;
        }
        thread::sleep(timing.poll_interval());
        outcome = client.authenticate(mode)?;
    }
    Ok(outcome)
}

/// The person holding the card, answering every prompt straight away
struct Phone {
    pending: Arc<FilePendingStore>,
    signer: Arc<SoftwareSigner>,
    gate: Arc<AuthGate>,
    user_name: String,
    deny_biometric: bool,
    timing: ConfirmationConfig,
}

impl Phone {
    fn run(self, events: &Receiver<UiEvent>, stop: &Receiver<()>) {
        let mut waiters = Vec::new();

        for event in events.iter() {
            match event {
                UiEvent::RegistrationConfirmation {
                    reader_id,
                    reader_name,
                } => {
                    if let Some(waiter) = self.confirm_registration(reader_id, reader_name, stop) {
                        waiters.push(waiter);
                    }
                }
                UiEvent::BiometricPrompt => {
                    let prompt = BiometricConfirmation::new(self.gate.clone());
                    if self.deny_biometric {
                        println!("Biometric prompt failed");
                        prompt.failed();
                    } else {
                        println!("Biometric prompt passed");
                        prompt.succeeded(AUTH_TYPE_BIOMETRIC);
                    }
                }
                UiEvent::NotRegistered => println!("Card: this reader does not know you"),
                UiEvent::Haptic => trace!("Haptic pulse"),
            }
        }

        for waiter in waiters {
            if waiter.join().is_err() {
                warn!("Registration hand-off thread panicked");
            }
        }
    }

    fn confirm_registration(
        &self,
        reader_id: String,
        reader_name: String,
        stop: &Receiver<()>,
    ) -> Option<JoinHandle<()>> {
        // The reader polls; only the first request opens a confirmation
        match self.pending.get() {
            Ok(Some(record)) if record.reader_id == reader_id => return None,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Cannot read pending registration");
                return None;
            }
        }

        let flow = RegistrationConfirmation::new(
            self.pending.clone(),
            self.signer.clone(),
            reader_id,
            reader_name,
        )
        .with_poll_interval(self.timing.poll_interval())
        .with_timeout(self.timing.timeout());

        if let Err(e) = flow.confirm(&self.user_name) {
            warn!(error = %e, "Registration confirmation failed");
            return None;
        }
        println!(
            "Confirmed registration with {} as {}",
            flow.reader_name(),
            self.user_name
        );

        let stop = stop.clone();
        Some(thread::spawn(move || {
            match flow.wait_until_consumed(&stop) {
                Ok(outcome) => {
                    info!(reader_id = flow.reader_id(), ?outcome, "Registration hand-off finished");
                }
                Err(e) => warn!(error = %e, "Registration hand-off failed"),
            }
        }))
    }
}
