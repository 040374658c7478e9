use std::thread;

use crate::config::*;
use crate::error::{BotError, Result};
use crate::outcome::LoginOutcome;
use crate::selector::{resolve_first, wait_for_any, Selector};
use crate::session::{DeviceSession, ElementHandle};
use crate::utils::{log_error, log_info, log_step, log_warn};

const STAGES: usize = 4;

/// The scripted login against the Instagram Android app.
pub struct LoginFlow<'a, S: DeviceSession + ?Sized> {
    session: &'a S,
    credentials: &'a Credentials,
    timings: &'a Timings,
}

impl<'a, S: DeviceSession + ?Sized> LoginFlow<'a, S> {
    pub fn new(session: &'a S, credentials: &'a Credentials, timings: &'a Timings) -> Self {
        Self { session, credentials, timings }
    }

    /// Clicks away whichever start-up prompts are showing. Returns how many were dismissed.
    pub fn dismiss_initial_screens(&self) -> Result<usize> {
        log_step(1, STAGES, "Waiting for the app to settle...");
        thread::sleep(self.timings.app_settle);

        let mut dismissed = 0;
        for prompt in DISMISS_PROMPTS {
            let Some(el) = self.session.find_by(prompt.by, prompt.query)? else { continue };
            if self.session.click(&el) {
                log_info(&format!("Dismissed prompt: {}", prompt.query));
                dismissed += 1;
                thread::sleep(self.timings.dismiss_pause);
            } else {
                log_warn(&format!("Prompt would not dismiss: {}", prompt.query));
            }
        }
        Ok(dismissed)
    }

    /// Opens the login form if a "Log in" entry is showing. `false` means
    /// nothing was clicked and the form is assumed to be on screen already.
    pub fn navigate_to_login(&self) -> Result<bool> {
        log_step(2, STAGES, "Looking for login screen...");
        let Some((selector, el)) = resolve_first(self.session, LOGIN_ENTRY)? else {
            log_info("No login entry found. Assuming login form is already open.");
            return Ok(false);
        };
        if !self.session.click(&el) {
            log_warn(&format!("Login entry did not respond: {}", selector.query));
            return Ok(false);
        }
        thread::sleep(self.timings.navigation_pause);
        Ok(true)
    }

    pub fn perform_login(&self) -> Result<()> {
        let account = self.credentials.redacted_username();
        log_step(3, STAGES, &format!("Inputting credentials for {}...", account));

        let user_el = wait_for_any(
            self.session,
            USERNAME_FIELD,
            self.timings.field_timeout,
            self.timings.poll_interval,
        )?
        .map(|(_, el)| el)
        .ok_or(BotError::ElementNotFound("username field"))?;
        let pass_el = self.required(PASSWORD_FIELD, "password field")?;

        self.type_into(&user_el, &self.credentials.username, "username field")?;
        self.type_into(&pass_el, &self.credentials.password, "password field")?;

        let submit = self.required(SUBMIT_BUTTON, "login button")?;
        if !self.session.click(&submit) {
            return Err(BotError::Interaction { action: "click", target: "login button" });
        }
        log_info("Submitted login form.");
        thread::sleep(self.timings.submit_settle);
        Ok(())
    }

    /// Success markers win over error text when both are on screen.
    pub fn verify_login(&self) -> Result<LoginOutcome> {
        log_step(4, STAGES, "Checking login status...");
        thread::sleep(self.timings.verify_settle);

        if let Some((selector, _)) = resolve_first(self.session, SUCCESS_INDICATORS)? {
            log_info(&format!("Login verified ({}).", selector.query));
            return Ok(LoginOutcome::Success);
        }
        if let Some((selector, el)) = resolve_first(self.session, FAILURE_INDICATORS)? {
            let detail = self.session.element_text(&el);
            log_error(&format!("Login rejected: {}", detail.as_deref().unwrap_or(selector.query)));
            return Ok(LoginOutcome::Failure { detail });
        }
        log_warn("Neither home screen nor error message detected.");
        Ok(LoginOutcome::Unclear)
    }

    fn attempt(&self) -> Result<LoginOutcome> {
        self.dismiss_initial_screens()?;
        self.navigate_to_login()?;
        self.perform_login()?;
        self.verify_login()
    }

    fn required(&self, candidates: &[Selector], what: &'static str) -> Result<ElementHandle> {
        resolve_first(self.session, candidates)?
            .map(|(_, el)| el)
            .ok_or(BotError::ElementNotFound(what))
    }

    fn type_into(&self, el: &ElementHandle, text: &str, what: &'static str) -> Result<()> {
        if !self.session.send_text(el, text) {
            return Err(BotError::Interaction { action: "type into", target: what });
        }
        thread::sleep(self.timings.field_pause);
        Ok(())
    }
}

/// Runs every stage, takes the outcome screenshot and releases the session.
///
/// Never returns an error: anything that aborts a stage becomes a failure.
/// `quit` is called exactly once on every path.
pub fn run<S: DeviceSession + ?Sized>(
    session: &S,
    credentials: &Credentials,
    timings: &Timings,
) -> LoginOutcome {
    let flow = LoginFlow::new(session, credentials, timings);
    let outcome = match flow.attempt() {
        Ok(outcome) => {
            snapshot(session, outcome.screenshot_label());
            outcome
        }
        Err(e) => {
            log_error(&format!("Login aborted: {}", e));
            snapshot(session, e.screenshot_label());
            LoginOutcome::failure(e.to_string())
        }
    };
    session.quit();
    outcome
}

fn snapshot<S: DeviceSession + ?Sized>(session: &S, label: &str) {
    match session.screenshot(label) {
        Ok(path) => log_info(&format!("Screenshot saved: {}", path.display())),
        Err(e) => log_warn(&format!("Screenshot '{}' failed: {}", label, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::fake::FakeSession;

    fn creds() -> Credentials {
        Credentials::new("someone", "hunter22")
    }

    fn login_form() -> FakeSession {
        FakeSession::new()
            .with(USERNAME_FIELD[0].query)
            .with(PASSWORD_FIELD[0].query)
            .with(SUBMIT_BUTTON[0].query)
    }

    fn run_fake(session: &FakeSession) -> LoginOutcome {
        run(session, &creds(), &Timings::immediate())
    }

    fn any_looked_up(session: &FakeSession, candidates: &[Selector]) -> bool {
        candidates.iter().any(|c| session.looked_up(c.query))
    }

    #[test]
    fn optional_stages_tolerate_an_empty_screen() {
        let session = FakeSession::new();
        let (creds, timings) = (creds(), Timings::immediate());
        let flow = LoginFlow::new(&session, &creds, &timings);

        assert_eq!(flow.dismiss_initial_screens().unwrap(), 0);
        assert!(!flow.navigate_to_login().unwrap());
        assert!(session.clicks.borrow().is_empty());
    }

    #[test]
    fn dismisses_every_prompt_that_is_showing() {
        let session = FakeSession::new()
            .with(DISMISS_PROMPTS[0].query)
            .with_broken_click(DISMISS_PROMPTS[1].query)
            .with(DISMISS_PROMPTS[2].query);
        let (creds, timings) = (creds(), Timings::immediate());
        let flow = LoginFlow::new(&session, &creds, &timings);

        assert_eq!(flow.dismiss_initial_screens().unwrap(), 2);
        assert_eq!(session.clicks.borrow().len(), 3);
    }

    #[test]
    fn login_entry_uses_first_resolving_candidate() {
        let session = FakeSession::new().with(LOGIN_ENTRY[2].query).with(LOGIN_ENTRY[3].query);
        let (creds, timings) = (creds(), Timings::immediate());
        let flow = LoginFlow::new(&session, &creds, &timings);

        assert!(flow.navigate_to_login().unwrap());
        assert_eq!(*session.clicks.borrow(), vec![LOGIN_ENTRY[2].query.to_string()]);
        assert!(!session.looked_up(LOGIN_ENTRY[3].query));
    }

    #[test]
    fn login_entry_prefers_dedicated_button_over_submit_text() {
        let session = FakeSession::new()
            .with(r#"new UiSelector().textContains("Log in")"#)
            .with("com.instagram.android:id/log_in_button");
        let (creds, timings) = (creds(), Timings::immediate());
        let flow = LoginFlow::new(&session, &creds, &timings);

        assert!(flow.navigate_to_login().unwrap());
        assert_eq!(
            *session.clicks.borrow(),
            vec!["com.instagram.android:id/log_in_button".to_string()]
        );
    }

    #[test]
    fn unresponsive_login_entry_is_not_fatal() {
        let session = FakeSession::new().with_broken_click(LOGIN_ENTRY[0].query);
        let (creds, timings) = (creds(), Timings::immediate());
        let flow = LoginFlow::new(&session, &creds, &timings);
        assert!(!flow.navigate_to_login().unwrap());
    }

    #[test]
    fn credentials_go_into_the_fields_found_by_fallback() {
        let session = FakeSession::new()
            .with(USERNAME_FIELD[2].query)
            .with(PASSWORD_FIELD[1].query)
            .with(SUBMIT_BUTTON[2].query);
        let (creds, timings) = (creds(), Timings::immediate());
        let flow = LoginFlow::new(&session, &creds, &timings);

        flow.perform_login().unwrap();

        assert_eq!(
            *session.typed.borrow(),
            vec![
                (USERNAME_FIELD[2].query.to_string(), "someone".to_string()),
                (PASSWORD_FIELD[1].query.to_string(), "hunter22".to_string()),
            ]
        );
        assert_eq!(*session.clicks.borrow(), vec![SUBMIT_BUTTON[2].query.to_string()]);
    }

    #[test]
    fn missing_username_field_fails_the_run() {
        let session = FakeSession::new().with(PASSWORD_FIELD[0].query).with(SUBMIT_BUTTON[0].query);

        let outcome = run_fake(&session);

        assert!(matches!(outcome, LoginOutcome::Failure { .. }));
        assert!(!any_looked_up(&session, PASSWORD_FIELD));
        assert!(!any_looked_up(&session, SUCCESS_INDICATORS));
        assert_eq!(*session.screenshots.borrow(), vec!["error".to_string()]);
        assert_eq!(session.quits.get(), 1);
    }

    #[test]
    fn missing_password_field_is_element_not_found() {
        let session = FakeSession::new().with(USERNAME_FIELD[0].query).with(SUBMIT_BUTTON[0].query);
        let (creds, timings) = (creds(), Timings::immediate());
        let flow = LoginFlow::new(&session, &creds, &timings);

        let err = flow.perform_login().unwrap_err();
        assert!(matches!(err, BotError::ElementNotFound("password field")));
        assert!(session.typed.borrow().is_empty());
    }

    #[test]
    fn missing_submit_button_is_element_not_found() {
        let session =
            FakeSession::new().with(USERNAME_FIELD[0].query).with(PASSWORD_FIELD[0].query);
        let (creds, timings) = (creds(), Timings::immediate());
        let flow = LoginFlow::new(&session, &creds, &timings);

        let err = flow.perform_login().unwrap_err();
        assert!(matches!(err, BotError::ElementNotFound("login button")));
        assert!(SUBMIT_BUTTON.iter().all(|s| session.looked_up(s.query)));
    }

    #[test]
    fn failed_typing_is_fatal() {
        let session = FakeSession::new()
            .with_broken_input(USERNAME_FIELD[0].query)
            .with(PASSWORD_FIELD[0].query)
            .with(SUBMIT_BUTTON[0].query);

        let outcome = run_fake(&session);

        assert!(matches!(
            outcome,
            LoginOutcome::Failure { detail: Some(ref d) } if d.contains("username field")
        ));
        assert!(session.clicks.borrow().is_empty());
        assert_eq!(session.quits.get(), 1);
    }

    #[test]
    fn failed_submit_click_is_fatal() {
        let session = FakeSession::new()
            .with(USERNAME_FIELD[0].query)
            .with(PASSWORD_FIELD[0].query)
            .with_broken_click(SUBMIT_BUTTON[0].query);

        let outcome = run_fake(&session);

        assert!(matches!(outcome, LoginOutcome::Failure { .. }));
        assert!(!any_looked_up(&session, SUCCESS_INDICATORS));
        assert_eq!(session.quits.get(), 1);
    }

    #[test]
    fn home_marker_means_success() {
        let session =
            login_form().with(SUCCESS_INDICATORS[2].query).with(FAILURE_INDICATORS[0].query);

        let outcome = run_fake(&session);

        assert_eq!(outcome, LoginOutcome::Success);
        assert!(!any_looked_up(&session, FAILURE_INDICATORS));
        assert_eq!(*session.screenshots.borrow(), vec!["success".to_string()]);
        assert_eq!(session.quits.get(), 1);
    }

    #[test]
    fn error_text_means_failure_with_detail() {
        let message = "The password you entered is incorrect. Please try again.";
        let session = login_form().with_text(FAILURE_INDICATORS[0].query, message);

        let outcome = run_fake(&session);

        assert_eq!(outcome, LoginOutcome::failure(message));
        assert_eq!(*session.screenshots.borrow(), vec!["error".to_string()]);
        assert_eq!(session.quits.get(), 1);
    }

    #[test]
    fn no_markers_means_unclear() {
        let session = login_form();

        let outcome = run_fake(&session);

        assert_eq!(outcome, LoginOutcome::Unclear);
        assert!(SUCCESS_INDICATORS
            .iter()
            .chain(FAILURE_INDICATORS)
            .all(|s| session.looked_up(s.query)));
        assert_eq!(*session.screenshots.borrow(), vec!["unclear".to_string()]);
        assert_eq!(session.quits.get(), 1);
    }

    #[test]
    fn server_error_while_dismissing_still_releases_once() {
        let session = login_form().failing_on(DISMISS_PROMPTS[0].query);

        let outcome = run_fake(&session);

        assert!(matches!(outcome, LoginOutcome::Failure { .. }));
        assert!(!any_looked_up(&session, LOGIN_ENTRY));
        assert_eq!(*session.screenshots.borrow(), vec!["critical_error".to_string()]);
        assert_eq!(session.quits.get(), 1);
    }

    #[test]
    fn server_error_while_navigating_still_releases_once() {
        let session = login_form().failing_on(LOGIN_ENTRY[0].query);

        let outcome = run_fake(&session);

        assert!(matches!(outcome, LoginOutcome::Failure { .. }));
        assert!(!any_looked_up(&session, USERNAME_FIELD));
        assert_eq!(*session.screenshots.borrow(), vec!["critical_error".to_string()]);
        assert_eq!(session.quits.get(), 1);
    }

    #[test]
    fn server_error_is_critical_and_still_releases() {
        let session = login_form().failing_on(SUCCESS_INDICATORS[0].query);

        let outcome = run_fake(&session);

        assert!(matches!(outcome, LoginOutcome::Failure { .. }));
        assert_eq!(*session.screenshots.borrow(), vec!["critical_error".to_string()]);
        assert_eq!(session.quits.get(), 1);
    }
}
