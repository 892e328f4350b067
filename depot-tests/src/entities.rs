use crate::impl_entity;
use depot_core::{
    ByteEnum, Computed, EntityDef, FieldDef, Generation, IndexDef, TableGenerator, Value,
    impl_byte_enum,
};
use time::PrimitiveDateTime;

/// Account with a database generated identity.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Account {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub balance: i64,
}

static ACCOUNT_FIELDS: [FieldDef; 4] = [
    FieldDef::new("id", Value::Int32(None))
        .primary_key()
        .generated(Generation::Identity),
    FieldDef::new("name", Value::Varchar(None)).length(64),
    FieldDef::new("email", Value::Varchar(None)).nullable().unique(),
    FieldDef::new("balance", Value::Int64(None)).default_value("0"),
];

pub static ACCOUNT: EntityDef = EntityDef::new("Account", &ACCOUNT_FIELDS).indexes(&[IndexDef {
    name: "Account_name",
    fields: &["name"],
    unique: false,
}]);

impl_entity!(Account, ACCOUNT, { id, name, email, balance });

/// Player keyed from the `IdSequences` table.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Player {
    pub id: i64,
    pub nickname: String,
    pub level: i16,
    pub last_seen: Option<PrimitiveDateTime>,
}

static PLAYER_FIELDS: [FieldDef; 4] = [
    FieldDef::new("id", Value::Int64(None))
        .primary_key()
        .generated(Generation::Table(
            TableGenerator::new().sequence("player").allocation_size(1),
        )),
    FieldDef::new("nickname", Value::Varchar(None))
        .column("nick")
        .length(32)
        .unique(),
    FieldDef::new("level", Value::Int16(None)).default_value("1"),
    FieldDef::new("last_seen", Value::Timestamp(None)).nullable(),
];

pub static PLAYER: EntityDef = EntityDef::new("Player", &PLAYER_FIELDS);

impl_entity!(Player, PLAYER, { id, nickname, level, last_seen });

/// Role of an account in a group, stored as its code.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    #[default]
    Member,
    Moderator,
    Owner,
}

impl ByteEnum for Role {
    fn code(&self) -> i8 {
        match self {
            Role::Member => 1,
            Role::Moderator => 2,
            Role::Owner => 3,
        }
    }
    fn from_code(code: i8) -> Option<Self> {
        match code {
            1 => Some(Role::Member),
            2 => Some(Role::Moderator),
            3 => Some(Role::Owner),
            _ => None,
        }
    }
}

impl_byte_enum!(Role);

/// Account membership in a group, keyed by both.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Membership {
    pub account_id: i32,
    pub group_name: String,
    pub role: Role,
    pub active: bool,
}

static MEMBERSHIP_FIELDS: [FieldDef; 4] = [
    FieldDef::new("account_id", Value::Int32(None))
        .column("accountId")
        .primary_key(),
    FieldDef::new("group_name", Value::Varchar(None))
        .column("groupName")
        .length(32)
        .primary_key(),
    FieldDef::new("role", Value::Int8(None)),
    FieldDef::new("active", Value::Boolean(None)).default_value("true"),
];

pub static MEMBERSHIP: EntityDef = EntityDef::new("Membership", &MEMBERSHIP_FIELDS).version(2);

impl_entity!(Membership, MEMBERSHIP, { account_id, group_name, role, active });

/// Read only projection of the `Account` table.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct AccountName {
    pub id: i32,
    pub name: String,
    pub rich: Option<bool>,
}

static ACCOUNT_NAME_FIELDS: [FieldDef; 3] = [
    FieldDef::new("id", Value::Int32(None)).primary_key(),
    FieldDef::new("name", Value::Varchar(None)),
    FieldDef::new("rich", Value::Boolean(None))
        .nullable()
        .computed(Computed::new().optional()),
];

pub static ACCOUNT_NAME: EntityDef = EntityDef::new("AccountName", &ACCOUNT_NAME_FIELDS)
    .computed(Computed::new().shadow_of(&ACCOUNT));

impl_entity!(AccountName, ACCOUNT_NAME, { id, name, rich });
