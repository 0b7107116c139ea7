//! In-memory model of the insurance portal.
//!
//! [`PortalFixture`] builds a [`MockPage`] whose routes reproduce the login
//! page, the admin dashboard (policies, installments and customers tabs, the
//! policy issuance form with its Jalali date picker) and the customer
//! dashboard. The default build is the fixed application; each `with_*` /
//! `without_*` toggle reintroduces one regression.

use std::sync::Arc;

use super::{MockDom, MockElement, MockPage};

/// Login page path
pub const LOGIN_PATH: &str = "/login";
/// Admin dashboard path
pub const ADMIN_DASHBOARD_PATH: &str = "/admin-dashboard";
/// Customer dashboard path
pub const CUSTOMER_DASHBOARD_PATH: &str = "/customer-dashboard";

const LABEL_NATIONAL_CODE: &str = "کد ملی";
const LABEL_PASSWORD: &str = "گذرواژه";
const BUTTON_LOGIN: &str = "ورود";
const BUTTON_LOGOUT: &str = "خروج";
const BUTTON_ISSUE_POLICY: &str = "صدور بیمه‌نامه";
const TAB_POLICIES: &str = "بیمه‌نامه‌ها";
const TAB_INSTALLMENTS: &str = "اقساط";
const TAB_CUSTOMERS: &str = "مشتریان";
const STATUS_NEAR_EXPIRE: &str = "نزدیک انقضا";
const CARD_NEAR_DUE: &str = "اقساط نزدیک سررسید";
const PLACEHOLDER_START: &str = "انتخاب تاریخ شروع";
const PLACEHOLDER_END: &str = "انتخاب تاریخ انقضا (اختیاری)";
const LOGIN_FAILED: &str = "کد ملی یا گذرواژه اشتباه است";

/// Jalali year and month shown by the date picker
const PICKER_YEAR: u32 = 1403;
const PICKER_MONTH: u32 = 2;
const PICKER_DAYS: u32 = 31;

const PANEL: &str = "panel.";
const START_FIELD: &str = "panel.form.start";
const END_FIELD: &str = "panel.form.end";
const CALENDAR: &str = "panel.calendar.";

/// Who an account logs in as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRole {
    /// Lands on the admin dashboard
    Admin,
    /// Lands on the customer dashboard
    Customer,
}

/// Seeded login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// National code used as username
    pub national_code: String,
    /// Password
    pub password: String,
    /// Dashboard the account lands on
    pub role: AccountRole,
}

impl Account {
    fn new(code: &str, password: &str, role: AccountRole) -> Self {
        Self {
            national_code: code.to_string(),
            password: password.to_string(),
            role,
        }
    }
}

/// Configurable in-memory portal
#[derive(Debug, Clone)]
pub struct PortalFixture {
    base_url: String,
    accounts: Vec<Account>,
    near_expire_status: bool,
    near_due_card: bool,
    end_date_autofill: bool,
    na_pay_id: bool,
    autofill_delay: u32,
    login_delay: u32,
}

impl PortalFixture {
    /// The fixed application with the demo accounts seeded
    #[must_use]
    pub fn fixed(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            accounts: vec![
                Account::new("admin", "admin", AccountRole::Admin),
                Account::new("1234567890", "1234567890", AccountRole::Customer),
            ],
            near_expire_status: false,
            near_due_card: false,
            end_date_autofill: true,
            na_pay_id: false,
            autofill_delay: 2,
            login_delay: 1,
        }
    }

    /// Installment rows show the "near expire" status again
    #[must_use]
    pub const fn with_near_expire_status(mut self) -> Self {
        self.near_expire_status = true;
        self
    }

    /// The "installments near due" summary card is shown again
    #[must_use]
    pub const fn with_near_due_card(mut self) -> Self {
        self.near_due_card = true;
        self
    }

    /// Picking a start date leaves the end date empty
    #[must_use]
    pub const fn without_end_date_autofill(mut self) -> Self {
        self.end_date_autofill = false;
        self
    }

    /// Policies without a pay id render "N/A"
    #[must_use]
    pub const fn with_na_pay_id(mut self) -> Self {
        self.na_pay_id = true;
        self
    }

    /// Remove a seeded account, so logging in with it fails
    #[must_use]
    pub fn without_account(mut self, national_code: &str) -> Self {
        self.accounts.retain(|a| a.national_code != national_code);
        self
    }

    /// Page observations before the auto-filled end date appears
    #[must_use]
    pub const fn with_autofill_delay(mut self, observations: u32) -> Self {
        self.autofill_delay = observations;
        self
    }

    /// Absolute URL of a portal path
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Build a fresh page with every route registered, parked on `about:blank`
    #[must_use]
    pub fn build(self) -> MockPage {
        let fixture = Arc::new(self);
        let mut dom = MockDom::new("about:blank");

        let fx = Arc::clone(&fixture);
        let _ = dom.route(fixture.url(LOGIN_PATH), move |dom| fx.login_page(dom));
        let fx = Arc::clone(&fixture);
        let _ = dom.route(fixture.url(ADMIN_DASHBOARD_PATH), move |dom| {
            fx.admin_dashboard(dom);
        });
        let fx = Arc::clone(&fixture);
        let _ = dom.route(fixture.url(CUSTOMER_DASHBOARD_PATH), move |dom| {
            fx.customer_dashboard(dom);
        });

        MockPage::new(dom)
    }

    // -------------------------------------------------------------------------
    // login
    // -------------------------------------------------------------------------

    fn login_page(self: &Arc<Self>, dom: &mut MockDom) {
        dom.push(
            MockElement::new("login.title")
                .role("heading")
                .text("ورود به سامانه بیمه"),
        );
        dom.push(MockElement::input("login.national_code").label(LABEL_NATIONAL_CODE));
        dom.push(MockElement::input("login.password").label(LABEL_PASSWORD));
        let fx = Arc::clone(self);
        dom.push(
            MockElement::button("login.submit", BUTTON_LOGIN).on_click(move |dom| fx.submit_login(dom)),
        );
    }

    fn submit_login(&self, dom: &mut MockDom) {
        let code = dom.value_of("login.national_code").unwrap_or_default().to_string();
        let password = dom.value_of("login.password").unwrap_or_default().to_string();
        let account = self
            .accounts
            .iter()
            .find(|a| a.national_code == code && a.password == password);

        match account {
            Some(account) => {
                let path = match account.role {
                    AccountRole::Admin => ADMIN_DASHBOARD_PATH,
                    AccountRole::Customer => CUSTOMER_DASHBOARD_PATH,
                };
                dom.open(self.url(path));
                dom.set_ready_state("loading");
                dom.defer(self.login_delay, |dom| dom.set_ready_state("complete"));
            }
            None if dom.element("login.error").is_none() => {
                dom.push(MockElement::new("login.error").role("alert").text(LOGIN_FAILED));
            }
            None => {}
        }
    }

    // -------------------------------------------------------------------------
    // admin dashboard
    // -------------------------------------------------------------------------

    fn admin_dashboard(self: &Arc<Self>, dom: &mut MockDom) {
        dom.push(
            MockElement::new("admin.title")
                .role("heading")
                .text("داشبورد مدیریت"),
        );
        let tabs: [(&str, &str, fn(&Arc<Self>, &mut MockDom)); 3] = [
            ("admin.tab.policies", TAB_POLICIES, Self::policies_panel),
            ("admin.tab.installments", TAB_INSTALLMENTS, Self::installments_panel),
            ("admin.tab.customers", TAB_CUSTOMERS, Self::customers_panel),
        ];
        for (id, title, panel) in tabs {
            let fx = Arc::clone(self);
            dom.push(MockElement::tab(id, title).on_click(move |dom| {
                dom.retain(|e| !e.id.starts_with(PANEL));
                panel(&fx, dom);
            }));
        }
        self.logout_button(dom, "admin.logout");
        self.policies_panel(dom);
    }

    fn logout_button(self: &Arc<Self>, dom: &mut MockDom, id: &str) {
        let fx = Arc::clone(self);
        dom.push(MockElement::button(id, BUTTON_LOGOUT).on_click(move |dom| {
            dom.open(fx.url(LOGIN_PATH));
        }));
    }

    fn policies_panel(self: &Arc<Self>, dom: &mut MockDom) {
        let fx = Arc::clone(self);
        dom.push(
            MockElement::button("panel.issue", BUTTON_ISSUE_POLICY)
                .on_click(move |dom| fx.issuance_form(dom)),
        );
        let rows = [
            ("PL-1001", "علی رضایی", "بدنه", "1403/01/10"),
            ("PL-1002", "مریم احمدی", "شخص ثالث", "1403/03/20"),
            ("PL-1003", "حسین کریمی", "آتش‌سوزی", "1402/11/08"),
        ];
        for (number, holder, kind, start) in rows {
            dom.push(
                MockElement::new(format!("panel.policy.{number}"))
                    .role("row")
                    .text(format!("{number} {holder} {kind} {start}")),
            );
        }
    }

    fn issuance_form(self: &Arc<Self>, dom: &mut MockDom) {
        if dom.element(START_FIELD).is_some() {
            return;
        }
        dom.push(
            MockElement::new("panel.form.title")
                .role("heading")
                .text("ثبت بیمه‌نامه جدید"),
        );
        dom.push(MockElement::input("panel.form.holder").label("بیمه‌گذار"));
        let fx = Arc::clone(self);
        dom.push(
            MockElement::input(START_FIELD)
                .placeholder(PLACEHOLDER_START)
                .read_only()
                .on_click(move |dom| fx.open_calendar(dom)),
        );
        dom.push(
            MockElement::input(END_FIELD)
                .placeholder(PLACEHOLDER_END)
                .read_only(),
        );
        dom.push(MockElement::button("panel.form.submit", "ثبت"));
    }

    fn open_calendar(self: &Arc<Self>, dom: &mut MockDom) {
        if dom.element("panel.calendar.title").is_some() {
            return;
        }
        dom.push(
            MockElement::new("panel.calendar.title")
                .role("heading")
                .text("اردیبهشت ۱۴۰۳"),
        );
        for day in 1..=PICKER_DAYS {
            let fx = Arc::clone(self);
            dom.push(
                MockElement::new(format!("panel.calendar.day.{day}"))
                    .role("gridcell")
                    .text(day.to_string())
                    .on_click(move |dom| fx.pick_start(dom, day)),
            );
        }
    }

    fn pick_start(&self, dom: &mut MockDom, day: u32) {
        dom.set_value(START_FIELD, jalali(PICKER_YEAR, PICKER_MONTH, day));
        dom.retain(|e| !e.id.starts_with(CALENDAR));
        if self.end_date_autofill {
            let end = jalali(PICKER_YEAR + 1, PICKER_MONTH, day);
            dom.defer(self.autofill_delay, move |dom| dom.set_value(END_FIELD, end));
        }
    }

    fn installments_panel(self: &Arc<Self>, dom: &mut MockDom) {
        let mut cards = vec![
            ("total", "کل اقساط: ۲۴".to_string()),
            ("paid", "اقساط پرداخت شده: ۱۸".to_string()),
            ("overdue", "اقساط معوق: ۲".to_string()),
        ];
        if self.near_due_card {
            cards.push(("near_due", format!("{CARD_NEAR_DUE}: ۴")));
        }
        for (id, text) in cards {
            dom.push(MockElement::new(format!("panel.card.{id}")).text(text));
        }

        let mut rows = vec![
            ("PL-1001", "1403/01/10", "پرداخت شده"),
            ("PL-1002", "1403/04/20", "در انتظار پرداخت"),
            ("PL-1003", "1402/12/08", "معوق"),
        ];
        if self.near_expire_status {
            rows.push(("PL-1004", "1403/02/28", STATUS_NEAR_EXPIRE));
        }
        for (i, (policy, due, status)) in rows.into_iter().enumerate() {
            dom.push(
                MockElement::new(format!("panel.installment.{i}"))
                    .role("row")
                    .text(format!("{policy} {due}")),
            );
            dom.push(MockElement::new(format!("panel.installment.{i}.status")).text(status));
        }
    }

    fn customers_panel(self: &Arc<Self>, dom: &mut MockDom) {
        for (code, name) in [("0012345678", "علی رضایی"), ("1234567890", "مریم احمدی")] {
            dom.push(
                MockElement::new(format!("panel.customer.{code}"))
                    .role("row")
                    .text(format!("{code} {name}")),
            );
        }
    }

    // -------------------------------------------------------------------------
    // customer dashboard
    // -------------------------------------------------------------------------

    fn customer_dashboard(self: &Arc<Self>, dom: &mut MockDom) {
        dom.push(
            MockElement::new("customer.title")
                .role("heading")
                .text("داشبورد مشتری"),
        );
        self.logout_button(dom, "customer.logout");

        let policies = [("PL-1002", "شخص ثالث", Some("PAY-7781")), ("PL-1006", "بدنه", None)];
        for (number, kind, pay_id) in policies {
            dom.push(
                MockElement::new(format!("customer.policy.{number}"))
                    .text(format!("بیمه‌نامه {number} {kind}")),
            );
            let pay_id = match pay_id {
                Some(id) => id,
                None if self.na_pay_id => "N/A",
                None => continue,
            };
            dom.push(
                MockElement::new(format!("customer.policy.{number}.pay_id"))
                    .text(format!("شناسه پرداخت: {pay_id}")),
            );
        }
    }
}

/// Format a Jalali date the way the portal displays it
fn jalali(year: u32, month: u32, day: u32) -> String {
    format!("{year:04}/{month:02}/{day:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::PageDriver;
    use crate::locator::Locator;
    use crate::wait::LoadState;
    use std::time::Duration;

    const BASE: &str = "http://portal.test";

    async fn open(page: &mut MockPage, path: &str) {
        page.goto(&format!("{BASE}{path}"), LoadState::Load, Duration::from_secs(1))
            .await
            .unwrap();
    }

    async fn login(page: &mut MockPage, code: &str, password: &str) {
        open(page, LOGIN_PATH).await;
        page.fill(&Locator::label(LABEL_NATIONAL_CODE), 0, code)
            .await
            .unwrap();
        page.fill(&Locator::label(LABEL_PASSWORD), 0, password)
            .await
            .unwrap();
        page.click(&Locator::role("button", BUTTON_LOGIN), 0)
            .await
            .unwrap();
    }

    mod login_tests {
        use super::*;

        #[tokio::test]
        async fn test_admin_lands_on_admin_dashboard() {
            let mut page = PortalFixture::fixed(BASE).build();
            login(&mut page, "admin", "admin").await;
            assert_eq!(
                page.current_url().await.unwrap(),
                format!("{BASE}{ADMIN_DASHBOARD_PATH}")
            );
        }

        #[tokio::test]
        async fn test_login_settles_after_loading() {
            let mut page = PortalFixture::fixed(BASE).build();
            login(&mut page, "1234567890", "1234567890").await;
            assert_eq!(page.ready_state().await.unwrap(), "complete");
        }

        #[tokio::test]
        async fn test_removed_account_stays_on_login() {
            let mut page = PortalFixture::fixed(BASE)
                .without_account("1234567890")
                .build();
            login(&mut page, "1234567890", "1234567890").await;
            assert!(page.current_url().await.unwrap().ends_with(LOGIN_PATH));
            assert_eq!(page.query(&Locator::text(LOGIN_FAILED)).await.unwrap().len(), 1);
        }
    }

    mod dashboard_tests {
        use super::*;

        #[tokio::test]
        async fn test_day_fifteen_is_unique_on_open_calendar() {
            let mut page = PortalFixture::fixed(BASE).build();
            login(&mut page, "admin", "admin").await;
            page.click(&Locator::role("button", BUTTON_ISSUE_POLICY), 0)
                .await
                .unwrap();
            page.click(&Locator::placeholder(PLACEHOLDER_START), 0)
                .await
                .unwrap();
            assert_eq!(page.query(&Locator::text("15")).await.unwrap().len(), 1);
        }

        #[tokio::test]
        async fn test_picking_start_autofills_end_later() {
            let mut page = PortalFixture::fixed(BASE).with_autofill_delay(2).build();
            login(&mut page, "admin", "admin").await;
            page.click(&Locator::role("button", BUTTON_ISSUE_POLICY), 0)
                .await
                .unwrap();
            page.click(&Locator::placeholder(PLACEHOLDER_START), 0)
                .await
                .unwrap();
            page.click(&Locator::text("15"), 0).await.unwrap();

            let end = Locator::placeholder("انتخاب تاریخ انقضا");
            let first = page.query(&end).await.unwrap();
            assert_eq!(first[0].value.as_deref(), Some(""));
            let second = page.query(&end).await.unwrap();
            assert_eq!(second[0].value.as_deref(), Some("1404/02/15"));
            assert_eq!(page.dom_mut().value_of(START_FIELD), Some("1403/02/15"));
        }

        #[tokio::test]
        async fn test_installments_tab_regressions() {
            let mut page = PortalFixture::fixed(BASE)
                .with_near_expire_status()
                .with_near_due_card()
                .build();
            login(&mut page, "admin", "admin").await;
            page.click(&Locator::role("tab", TAB_INSTALLMENTS), 0)
                .await
                .unwrap();
            assert_eq!(page.query(&Locator::text(STATUS_NEAR_EXPIRE)).await.unwrap().len(), 1);
            assert_eq!(page.query(&Locator::text(CARD_NEAR_DUE)).await.unwrap().len(), 1);
            assert!(page
                .query(&Locator::role("button", BUTTON_ISSUE_POLICY))
                .await
                .unwrap()
                .is_empty());
        }

        #[tokio::test]
        async fn test_customer_pay_id_placeholder_toggle() {
            let mut fixed = PortalFixture::fixed(BASE).build();
            login(&mut fixed, "1234567890", "1234567890").await;
            assert!(fixed.query(&Locator::text("N/A")).await.unwrap().is_empty());

            let mut broken = PortalFixture::fixed(BASE).with_na_pay_id().build();
            login(&mut broken, "1234567890", "1234567890").await;
            assert_eq!(broken.query(&Locator::text("N/A")).await.unwrap().len(), 1);
        }

        #[tokio::test]
        async fn test_logout_returns_to_login() {
            let mut page = PortalFixture::fixed(BASE).build();
            login(&mut page, "admin", "admin").await;
            page.click(&Locator::role("button", BUTTON_LOGOUT), 0)
                .await
                .unwrap();
            assert_eq!(
                page.current_url().await.unwrap(),
                format!("{BASE}{LOGIN_PATH}")
            );
        }
    }

    #[test]
    fn test_jalali_is_zero_padded() {
        assert_eq!(jalali(1403, 2, 5), "1403/02/05");
    }
}
