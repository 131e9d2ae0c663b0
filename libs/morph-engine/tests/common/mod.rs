#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use morph_api::{Reflect, Value};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── Scalars ─────────────────────────────────────────────────────

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Count {
    pub n: i32,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct CountText {
    pub n: String,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Wide {
    pub n: i64,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Narrow {
    pub n: i32,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Text {
    pub s: String,
}

// ── Containers ──────────────────────────────────────────────────

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Scores {
    pub by_name: HashMap<String, i32>,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct ScoresText {
    pub by_name: HashMap<String, String>,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Grid {
    pub fixed: [i32; 2],
    pub pair: [i32; 2],
    pub list: Vec<i32>,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct GridDto {
    pub fixed: Vec<i64>,
    pub pair: [i64; 2],
    pub list: Box<[String]>,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Word {
    pub text: String,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Letters {
    pub text: Vec<char>,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Ticket {
    pub status: Status,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct TicketCode {
    pub status: i32,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Maybe {
    pub n: Option<i32>,
}

// ── Round trip ──────────────────────────────────────────────────

#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq)]
pub enum Status {
    #[default]
    Draft,
    Active,
    Closed,
}

#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq)]
pub enum StatusDto {
    #[default]
    Draft,
    Active,
    Closed,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Address {
    pub city: String,
    pub zip: String,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct AddressDto {
    pub city: String,
    pub zip: String,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Account {
    pub id: i32,
    pub name: String,
    pub tags: Vec<String>,
    pub status: Status,
    pub address: Address,
    pub nickname: Option<String>,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct AccountDto {
    pub id: i32,
    pub name: String,
    pub tags: BTreeSet<String>,
    pub status: StatusDto,
    pub address: AddressDto,
    pub nickname: Option<String>,
}

pub fn account() -> Account {
    Account {
        id: 7,
        name: "Ada".into(),
        tags: vec!["admin".into(), "ops".into()],
        status: Status::Active,
        address: Address { city: "Paris".into(), zip: "75001".into() },
        nickname: Some("ada".into()),
    }
}

// ── Strategies ──────────────────────────────────────────────────

#[derive(Reflect, Clone, Debug, Default)]
pub struct Order {
    #[reflect(alias = "order_id")]
    pub id: i64,
    pub billing: Address,
    pub shipping: Address,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct OrderView {
    pub order_id: i64,
    #[reflect(source = "shipping.city")]
    pub destination: String,
    pub billing_city: String,
    #[allow(non_snake_case)]
    pub billingZip: String,
}

#[derive(Reflect, Clone, Debug, Default)]
pub struct PersonDto {
    pub full_name: String,
}

#[derive(Reflect, Clone, Debug, Default)]
pub struct Employee {
    pub name: String,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Person {
    #[reflect(source(name = "full_name", when = "PersonDto"))]
    pub name: String,
}

// ── Policy ──────────────────────────────────────────────────────

#[derive(Reflect, Clone, Debug, Default)]
#[reflect(getter(method = "get_tags", ty = "Vec<String>", expandable))]
pub struct Tagged {
    pub name: String,
    pub password: String,
    #[reflect(skip)]
    pub tags: Vec<String>,
    #[reflect(skip)]
    pub reads: Arc<AtomicUsize>,
}

impl Tagged {
    pub fn get_tags(&self) -> Vec<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.tags.clone()
    }
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct TaggedDto {
    pub name: String,
    pub password: String,
    pub tags: Vec<String>,
}

#[derive(Reflect, Clone, Debug, Default)]
#[reflect(getter(method = "get_extras", ty = "Vec<Value>", expandable))]
pub struct Loose {
    pub name: String,
    #[reflect(skip)]
    pub extras: Vec<String>,
    #[reflect(skip)]
    pub reads: Arc<AtomicUsize>,
}

impl Loose {
    pub fn get_extras(&self) -> Vec<Value> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.extras.iter().cloned().map(Value::Str).collect()
    }
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct LooseDto {
    pub name: String,
    pub extras: Vec<String>,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    #[reflect(expandable)]
    pub items: Vec<String>,
    pub title: String,
}

// ── Generic ─────────────────────────────────────────────────────

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct User {
    pub id: i32,
    pub name: String,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct UserDto {
    pub id: i64,
    pub name: String,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Outer<T> {
    pub inner: Page<T>,
    pub label: String,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Envelope {
    pub page: Page<User>,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct EnvelopeDto {
    pub page: Page<UserDto>,
}

// ── Escape hatches ──────────────────────────────────────────────

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
#[reflect(constructor(path = "Money::from_cents", arg = "i64"))]
pub struct Money {
    pub cents: i64,
}

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money { cents }
    }
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
#[reflect(factory(path = "Email::parse", arg = "String"))]
pub struct Email {
    pub address: String,
}

impl Email {
    pub fn parse(address: String) -> Result<Email, String> {
        if address.contains('@') {
            Ok(Email { address })
        } else {
            Err(format!("'{address}' is not an email address"))
        }
    }
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct Fahrenheit {
    pub degrees: f64,
}

#[derive(Reflect, Clone, Debug, Default)]
#[reflect(into(method = "to_fahrenheit", ty = "Fahrenheit"))]
pub struct Celsius {
    pub degrees: f64,
}

impl Celsius {
    pub fn to_fahrenheit(&self) -> Fahrenheit {
        Fahrenheit { degrees: self.degrees * 9.0 / 5.0 + 32.0 }
    }
}

#[derive(Reflect, Clone, Debug, Default)]
pub struct Invoice {
    pub price: i64,
    pub contact: String,
    pub temperature: Celsius,
}

#[derive(Reflect, Clone, Debug, Default, PartialEq)]
pub struct InvoiceDto {
    pub price: Money,
    pub contact: Email,
    pub temperature: Fahrenheit,
}

// ── Shared graphs ───────────────────────────────────────────────

#[derive(Reflect, Clone, Debug, Default)]
pub struct Node {
    pub next: Option<Arc<RwLock<Node>>>,
}
