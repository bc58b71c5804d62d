//! SQLite schema definitions and SQL query constants.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings and dates as
//! `YYYY-MM-DD`, so ordering by the text column is chronological.

/// SQL statement to create all tables.
pub const CREATE_TABLES: &str = r#"
PRAGMA foreign_keys = ON;

-- Users table; the password hash never leaves this table.
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE COLLATE NOCASE,
    full_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    initials TEXT NOT NULL,
    avatar_color TEXT NOT NULL,
    role TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_active TEXT
);

-- Deals table
CREATE TABLE IF NOT EXISTS deals (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    sector TEXT,
    stage TEXT NOT NULL,
    round TEXT,
    target_raise INTEGER,
    valuation INTEGER,
    lead_investor TEXT,
    contact_name TEXT,
    contact_email TEXT,
    website TEXT,
    tags TEXT NOT NULL,
    rejection_reason TEXT,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Deal timeline
CREATE TABLE IF NOT EXISTS timeline_events (
    id TEXT PRIMARY KEY,
    deal_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    content TEXT NOT NULL,
    metadata TEXT NOT NULL,
    user_id TEXT,
    created_at TEXT NOT NULL,
    FOREIGN KEY (deal_id) REFERENCES deals(id) ON DELETE CASCADE
);

-- Stars
CREATE TABLE IF NOT EXISTS deal_stars (
    deal_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (deal_id, user_id),
    FOREIGN KEY (deal_id) REFERENCES deals(id) ON DELETE CASCADE
);

-- Mini memos and their comments
CREATE TABLE IF NOT EXISTS mini_memos (
    id TEXT PRIMARY KEY,
    deal_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    thesis TEXT NOT NULL,
    risks TEXT,
    value_creation TEXT,
    score INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (deal_id) REFERENCES deals(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS memo_comments (
    id TEXT PRIMARY KEY,
    memo_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (memo_id) REFERENCES mini_memos(id) ON DELETE CASCADE
);

-- Assignments
CREATE TABLE IF NOT EXISTS deal_assignments (
    deal_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    assigned_by TEXT NOT NULL,
    assigned_at TEXT NOT NULL,
    PRIMARY KEY (deal_id, user_id),
    FOREIGN KEY (deal_id) REFERENCES deals(id) ON DELETE CASCADE
);

-- Funds
CREATE TABLE IF NOT EXISTS funds (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    vintage INTEGER,
    target_size INTEGER,
    currency TEXT NOT NULL,
    status TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Allocations block deletion of their fund and deal.
CREATE TABLE IF NOT EXISTS fund_allocations (
    id TEXT PRIMARY KEY,
    fund_id TEXT NOT NULL,
    deal_id TEXT NOT NULL,
    amount INTEGER NOT NULL,
    paid_amount INTEGER NOT NULL,
    security_type TEXT NOT NULL,
    allocation_date TEXT NOT NULL,
    status TEXT NOT NULL,
    portfolio_weight REAL NOT NULL,
    market_value INTEGER,
    total_returned INTEGER NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (fund_id) REFERENCES funds(id),
    FOREIGN KEY (deal_id) REFERENCES deals(id)
);

CREATE TABLE IF NOT EXISTS capital_calls (
    id TEXT PRIMARY KEY,
    allocation_id TEXT NOT NULL,
    fund_id TEXT NOT NULL,
    call_number INTEGER NOT NULL,
    call_date TEXT NOT NULL,
    due_date TEXT NOT NULL,
    amount_type TEXT NOT NULL,
    call_percentage REAL,
    call_amount INTEGER NOT NULL,
    paid_amount INTEGER NOT NULL,
    paid_date TEXT,
    status TEXT NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (allocation_id) REFERENCES fund_allocations(id) ON DELETE CASCADE
);

-- Documents keep their bytes inline.
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    deal_id TEXT NOT NULL,
    file_name TEXT NOT NULL,
    content_type TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    document_type TEXT NOT NULL,
    description TEXT,
    uploaded_by TEXT NOT NULL,
    uploaded_at TEXT NOT NULL,
    content BLOB NOT NULL,
    FOREIGN KEY (deal_id) REFERENCES deals(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    deal_id TEXT,
    read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    FOREIGN KEY (deal_id) REFERENCES deals(id) ON DELETE SET NULL
);

-- Indexes for efficient queries
CREATE INDEX IF NOT EXISTS idx_deals_updated_at ON deals(updated_at);
CREATE INDEX IF NOT EXISTS idx_timeline_deal_id ON timeline_events(deal_id, created_at);
CREATE INDEX IF NOT EXISTS idx_timeline_created_at ON timeline_events(created_at);
CREATE INDEX IF NOT EXISTS idx_stars_user_id ON deal_stars(user_id);
CREATE INDEX IF NOT EXISTS idx_memos_deal_id ON mini_memos(deal_id);
CREATE INDEX IF NOT EXISTS idx_comments_memo_id ON memo_comments(memo_id);
CREATE INDEX IF NOT EXISTS idx_assignments_user_id ON deal_assignments(user_id);
CREATE INDEX IF NOT EXISTS idx_allocations_fund_id ON fund_allocations(fund_id);
CREATE INDEX IF NOT EXISTS idx_allocations_deal_id ON fund_allocations(deal_id);
CREATE INDEX IF NOT EXISTS idx_calls_allocation_id ON capital_calls(allocation_id);
CREATE INDEX IF NOT EXISTS idx_calls_fund_due ON capital_calls(fund_id, due_date);
CREATE INDEX IF NOT EXISTS idx_documents_deal_id ON documents(deal_id);
CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, created_at);
"#;

// User queries
pub const INSERT_USER: &str = r#"
INSERT INTO users (id, username, full_name, email, initials, avatar_color, role, password_hash, created_at, last_active)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
"#;

pub const SELECT_USER_BY_ID: &str = r#"
SELECT id, username, full_name, email, initials, avatar_color, role, created_at, last_active
FROM users
WHERE id = ?1
"#;

pub const SELECT_USER_BY_USERNAME: &str = r#"
SELECT id, username, full_name, email, initials, avatar_color, role, created_at, last_active
FROM users
WHERE username = ?1
"#;

pub const SELECT_USER_BY_EMAIL: &str = r#"
SELECT id, username, full_name, email, initials, avatar_color, role, created_at, last_active
FROM users
WHERE email = ?1
"#;

pub const SELECT_USERS: &str = r#"
SELECT id, username, full_name, email, initials, avatar_color, role, created_at, last_active
FROM users
ORDER BY full_name, username
"#;

pub const UPDATE_USER: &str = r#"
UPDATE users
SET username = ?2, full_name = ?3, email = ?4, initials = ?5, avatar_color = ?6, role = ?7, last_active = ?8
WHERE id = ?1
"#;

pub const DELETE_USER: &str = "DELETE FROM users WHERE id = ?1";

pub const DELETE_STARS_BY_USER: &str = "DELETE FROM deal_stars WHERE user_id = ?1";

pub const DELETE_ASSIGNMENTS_BY_USER: &str = "DELETE FROM deal_assignments WHERE user_id = ?1";

pub const DELETE_NOTIFICATIONS_BY_USER: &str = "DELETE FROM notifications WHERE user_id = ?1";

pub const SELECT_PASSWORD_HASH: &str = "SELECT password_hash FROM users WHERE id = ?1";

pub const UPDATE_PASSWORD_HASH: &str = "UPDATE users SET password_hash = ?2 WHERE id = ?1";

// Deal queries
pub const INSERT_DEAL: &str = r#"
INSERT INTO deals (id, name, description, sector, stage, round, target_raise, valuation, lead_investor,
                   contact_name, contact_email, website, tags, rejection_reason, created_by, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
"#;

pub const SELECT_DEAL_BY_ID: &str = r#"
SELECT id, name, description, sector, stage, round, target_raise, valuation, lead_investor,
       contact_name, contact_email, website, tags, rejection_reason, created_by, created_at, updated_at
FROM deals
WHERE id = ?1
"#;

pub const SELECT_DEALS: &str = r#"
SELECT id, name, description, sector, stage, round, target_raise, valuation, lead_investor,
       contact_name, contact_email, website, tags, rejection_reason, created_by, created_at, updated_at
FROM deals
ORDER BY updated_at DESC, name
"#;

pub const UPDATE_DEAL: &str = r#"
UPDATE deals
SET name = ?2, description = ?3, sector = ?4, stage = ?5, round = ?6, target_raise = ?7, valuation = ?8,
    lead_investor = ?9, contact_name = ?10, contact_email = ?11, website = ?12, tags = ?13,
    rejection_reason = ?14, updated_at = ?15
WHERE id = ?1
"#;

pub const DELETE_DEAL: &str = "DELETE FROM deals WHERE id = ?1";

pub const COUNT_ALLOCATIONS_BY_DEAL: &str =
    "SELECT COUNT(*) FROM fund_allocations WHERE deal_id = ?1";

// Timeline queries
pub const INSERT_TIMELINE_EVENT: &str = r#"
INSERT INTO timeline_events (id, deal_id, event_type, content, metadata, user_id, created_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
"#;

pub const SELECT_TIMELINE_BY_DEAL: &str = r#"
SELECT id, deal_id, event_type, content, metadata, user_id, created_at
FROM timeline_events
WHERE deal_id = ?1
ORDER BY created_at DESC
"#;

pub const SELECT_RECENT_TIMELINE: &str = r#"
SELECT id, deal_id, event_type, content, metadata, user_id, created_at
FROM timeline_events
ORDER BY created_at DESC
LIMIT ?1
"#;

// Star queries
pub const INSERT_STAR: &str =
    "INSERT INTO deal_stars (deal_id, user_id, created_at) VALUES (?1, ?2, ?3)";

pub const DELETE_STAR: &str = "DELETE FROM deal_stars WHERE deal_id = ?1 AND user_id = ?2";

pub const SELECT_STARS_BY_DEAL: &str = r#"
SELECT deal_id, user_id, created_at FROM deal_stars WHERE deal_id = ?1 ORDER BY created_at
"#;

pub const SELECT_STARS_BY_USER: &str = r#"
SELECT deal_id, user_id, created_at FROM deal_stars WHERE user_id = ?1 ORDER BY created_at
"#;

pub const SELECT_ALL_STARS: &str = "SELECT deal_id, user_id, created_at FROM deal_stars";

// Memo queries
pub const INSERT_MEMO: &str = r#"
INSERT INTO mini_memos (id, deal_id, user_id, thesis, risks, value_creation, score, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
"#;

pub const SELECT_MEMO_BY_ID: &str = r#"
SELECT id, deal_id, user_id, thesis, risks, value_creation, score, created_at, updated_at
FROM mini_memos
WHERE id = ?1
"#;

pub const SELECT_MEMOS_BY_DEAL: &str = r#"
SELECT id, deal_id, user_id, thesis, risks, value_creation, score, created_at, updated_at
FROM mini_memos
WHERE deal_id = ?1
ORDER BY created_at DESC
"#;

pub const SELECT_ALL_MEMOS: &str = r#"
SELECT id, deal_id, user_id, thesis, risks, value_creation, score, created_at, updated_at
FROM mini_memos
"#;

pub const UPDATE_MEMO: &str = r#"
UPDATE mini_memos
SET thesis = ?2, risks = ?3, value_creation = ?4, score = ?5, updated_at = ?6
WHERE id = ?1
"#;

pub const DELETE_MEMO: &str = "DELETE FROM mini_memos WHERE id = ?1";

pub const INSERT_COMMENT: &str = r#"
INSERT INTO memo_comments (id, memo_id, user_id, content, created_at)
VALUES (?1, ?2, ?3, ?4, ?5)
"#;

pub const SELECT_COMMENTS_BY_MEMO: &str = r#"
SELECT id, memo_id, user_id, content, created_at
FROM memo_comments
WHERE memo_id = ?1
ORDER BY created_at
"#;

// Assignment queries
pub const INSERT_ASSIGNMENT: &str = r#"
INSERT INTO deal_assignments (deal_id, user_id, assigned_by, assigned_at)
VALUES (?1, ?2, ?3, ?4)
"#;

pub const DELETE_ASSIGNMENT: &str =
    "DELETE FROM deal_assignments WHERE deal_id = ?1 AND user_id = ?2";

pub const SELECT_ASSIGNMENTS_BY_DEAL: &str = r#"
SELECT deal_id, user_id, assigned_by, assigned_at
FROM deal_assignments
WHERE deal_id = ?1
ORDER BY assigned_at
"#;

pub const SELECT_ASSIGNMENTS_BY_USER: &str = r#"
SELECT deal_id, user_id, assigned_by, assigned_at
FROM deal_assignments
WHERE user_id = ?1
ORDER BY assigned_at
"#;

pub const SELECT_ALL_ASSIGNMENTS: &str =
    "SELECT deal_id, user_id, assigned_by, assigned_at FROM deal_assignments";

// Fund queries
pub const INSERT_FUND: &str = r#"
INSERT INTO funds (id, name, vintage, target_size, currency, status, description, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
"#;

pub const SELECT_FUND_BY_ID: &str = r#"
SELECT id, name, vintage, target_size, currency, status, description, created_at, updated_at
FROM funds
WHERE id = ?1
"#;

pub const SELECT_FUNDS: &str = r#"
SELECT id, name, vintage, target_size, currency, status, description, created_at, updated_at
FROM funds
ORDER BY name
"#;

pub const UPDATE_FUND: &str = r#"
UPDATE funds
SET name = ?2, vintage = ?3, target_size = ?4, currency = ?5, status = ?6, description = ?7, updated_at = ?8
WHERE id = ?1
"#;

pub const DELETE_FUND: &str = "DELETE FROM funds WHERE id = ?1";

pub const COUNT_ALLOCATIONS_BY_FUND: &str =
    "SELECT COUNT(*) FROM fund_allocations WHERE fund_id = ?1";

// Allocation queries
pub const UPSERT_ALLOCATION: &str = r#"
INSERT INTO fund_allocations (id, fund_id, deal_id, amount, paid_amount, security_type, allocation_date, status,
                              portfolio_weight, market_value, total_returned, notes, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
ON CONFLICT(id) DO UPDATE SET
    amount = excluded.amount,
    paid_amount = excluded.paid_amount,
    security_type = excluded.security_type,
    allocation_date = excluded.allocation_date,
    status = excluded.status,
    portfolio_weight = excluded.portfolio_weight,
    market_value = excluded.market_value,
    total_returned = excluded.total_returned,
    notes = excluded.notes,
    updated_at = excluded.updated_at
"#;

pub const SELECT_ALLOCATION_BY_ID: &str = r#"
SELECT id, fund_id, deal_id, amount, paid_amount, security_type, allocation_date, status,
       portfolio_weight, market_value, total_returned, notes, created_at, updated_at
FROM fund_allocations
WHERE id = ?1
"#;

pub const SELECT_ALLOCATIONS_BY_FUND: &str = r#"
SELECT id, fund_id, deal_id, amount, paid_amount, security_type, allocation_date, status,
       portfolio_weight, market_value, total_returned, notes, created_at, updated_at
FROM fund_allocations
WHERE fund_id = ?1
ORDER BY created_at, id
"#;

pub const SELECT_ALLOCATIONS_BY_DEAL: &str = r#"
SELECT id, fund_id, deal_id, amount, paid_amount, security_type, allocation_date, status,
       portfolio_weight, market_value, total_returned, notes, created_at, updated_at
FROM fund_allocations
WHERE deal_id = ?1
ORDER BY created_at, id
"#;

pub const SELECT_ALL_ALLOCATIONS: &str = r#"
SELECT id, fund_id, deal_id, amount, paid_amount, security_type, allocation_date, status,
       portfolio_weight, market_value, total_returned, notes, created_at, updated_at
FROM fund_allocations
ORDER BY created_at, id
"#;

pub const DELETE_ALLOCATION: &str = "DELETE FROM fund_allocations WHERE id = ?1";

// Capital call queries
pub const UPSERT_CAPITAL_CALL: &str = r#"
INSERT INTO capital_calls (id, allocation_id, fund_id, call_number, call_date, due_date, amount_type,
                           call_percentage, call_amount, paid_amount, paid_date, status, notes, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
ON CONFLICT(id) DO UPDATE SET
    call_number = excluded.call_number,
    call_date = excluded.call_date,
    due_date = excluded.due_date,
    amount_type = excluded.amount_type,
    call_percentage = excluded.call_percentage,
    call_amount = excluded.call_amount,
    paid_amount = excluded.paid_amount,
    paid_date = excluded.paid_date,
    status = excluded.status,
    notes = excluded.notes,
    updated_at = excluded.updated_at
"#;

pub const SELECT_CAPITAL_CALL_BY_ID: &str = r#"
SELECT id, allocation_id, fund_id, call_number, call_date, due_date, amount_type, call_percentage,
       call_amount, paid_amount, paid_date, status, notes, created_at, updated_at
FROM capital_calls
WHERE id = ?1
"#;

pub const SELECT_CAPITAL_CALLS_BY_ALLOCATION: &str = r#"
SELECT id, allocation_id, fund_id, call_number, call_date, due_date, amount_type, call_percentage,
       call_amount, paid_amount, paid_date, status, notes, created_at, updated_at
FROM capital_calls
WHERE allocation_id = ?1
ORDER BY call_number
"#;

pub const SELECT_CAPITAL_CALLS_BY_FUND: &str = r#"
SELECT id, allocation_id, fund_id, call_number, call_date, due_date, amount_type, call_percentage,
       call_amount, paid_amount, paid_date, status, notes, created_at, updated_at
FROM capital_calls
WHERE fund_id = ?1
ORDER BY due_date, call_number
"#;

pub const SELECT_ALL_CAPITAL_CALLS: &str = r#"
SELECT id, allocation_id, fund_id, call_number, call_date, due_date, amount_type, call_percentage,
       call_amount, paid_amount, paid_date, status, notes, created_at, updated_at
FROM capital_calls
ORDER BY due_date, call_number
"#;

pub const DELETE_CAPITAL_CALL: &str = "DELETE FROM capital_calls WHERE id = ?1";

// Document queries
pub const INSERT_DOCUMENT: &str = r#"
INSERT INTO documents (id, deal_id, file_name, content_type, size_bytes, document_type, description,
                       uploaded_by, uploaded_at, content)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
"#;

pub const SELECT_DOCUMENT_BY_ID: &str = r#"
SELECT id, deal_id, file_name, content_type, size_bytes, document_type, description, uploaded_by, uploaded_at
FROM documents
WHERE id = ?1
"#;

pub const SELECT_DOCUMENT_CONTENT: &str = "SELECT content FROM documents WHERE id = ?1";

pub const SELECT_DOCUMENTS_BY_DEAL: &str = r#"
SELECT id, deal_id, file_name, content_type, size_bytes, document_type, description, uploaded_by, uploaded_at
FROM documents
WHERE deal_id = ?1
ORDER BY uploaded_at DESC
"#;

pub const DELETE_DOCUMENT: &str = "DELETE FROM documents WHERE id = ?1";

// Notification queries
pub const INSERT_NOTIFICATION: &str = r#"
INSERT INTO notifications (id, user_id, kind, title, message, deal_id, read, created_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
"#;

pub const SELECT_NOTIFICATIONS: &str = r#"
SELECT id, user_id, kind, title, message, deal_id, read, created_at
FROM notifications
WHERE user_id = ?1 AND (?2 = 0 OR read = 0)
ORDER BY created_at DESC
LIMIT ?3
"#;

pub const COUNT_UNREAD_NOTIFICATIONS: &str =
    "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read = 0";

pub const MARK_NOTIFICATION_READ: &str =
    "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2";

pub const MARK_ALL_NOTIFICATIONS_READ: &str =
    "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0";

pub const DELETE_NOTIFICATION: &str = "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2";
