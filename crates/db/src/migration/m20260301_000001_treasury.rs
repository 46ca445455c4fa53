//! Treasury schema: accounts, checks, movements, closings and statements.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(TREASURY_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS bank_statement_items, bank_statements, cash_closings, \
             movements, checks, bank_accounts, cash_accounts CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const TREASURY_SQL: &str = r"
-- Cash drawers: cash on hand plus the checks they hold in custody
CREATE TABLE cash_accounts (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    portfolio_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_cash_accounts_company ON cash_accounts(company_id, created_at);

CREATE TABLE bank_accounts (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    name VARCHAR(255) NOT NULL,
    bank_name VARCHAR(255) NOT NULL,
    account_number VARCHAR(64) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_bank_accounts_company ON bank_accounts(company_id, created_at);

CREATE TABLE checks (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    number VARCHAR(64) NOT NULL,
    bank_name VARCHAR(255) NOT NULL,
    issuer VARCHAR(255) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    due_date DATE,
    state VARCHAR(16) NOT NULL,
    custody_account_id UUID NOT NULL REFERENCES cash_accounts(id),
    deposited_into UUID REFERENCES bank_accounts(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_check_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_check_state CHECK (
        state IN ('CUSTODY', 'DEPOSITED', 'CLEARED', 'REJECTED', 'RETURNED')
    )
);

CREATE INDEX idx_checks_custody ON checks(custody_account_id, state);

-- Movements: one immutable signed fact against exactly one account
CREATE TABLE movements (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    date DATE NOT NULL,
    value_date DATE,
    direction VARCHAR(8) NOT NULL,
    medium VARCHAR(32) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    account_kind VARCHAR(16) NOT NULL,
    cash_account_id UUID REFERENCES cash_accounts(id),
    bank_account_id UUID REFERENCES bank_accounts(id),
    check_id UUID REFERENCES checks(id),
    description TEXT NOT NULL DEFAULT '',
    reference_type VARCHAR(64),
    reference_id VARCHAR(255),
    state VARCHAR(16) NOT NULL,
    reversal_of_id UUID REFERENCES movements(id),
    -- Set before the offset row is inserted in the same transaction
    reversed_by_id UUID REFERENCES movements(id) DEFERRABLE INITIALLY DEFERRED,
    reconciled_item_id UUID,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_movement_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_movement_direction CHECK (direction IN ('INFLOW', 'OUTFLOW')),
    CONSTRAINT chk_movement_state CHECK (state IN ('PENDING', 'CONFIRMED', 'REVERSED')),
    CONSTRAINT chk_movement_single_target CHECK (
        num_nonnulls(cash_account_id, bank_account_id, check_id) = 1
    ),
    CONSTRAINT chk_movement_kind_matches_target CHECK (
        (account_kind = 'CASH' AND cash_account_id IS NOT NULL)
        OR (account_kind = 'BANK' AND bank_account_id IS NOT NULL)
        OR (account_kind = 'CHECK_PORTFOLIO' AND check_id IS NOT NULL)
    ),
    CONSTRAINT chk_movement_document CHECK ((reference_type IS NULL) = (reference_id IS NULL))
);

-- A movement is reversed at most once
CREATE UNIQUE INDEX idx_movements_reversal_of ON movements(reversal_of_id)
    WHERE reversal_of_id IS NOT NULL;

CREATE INDEX idx_movements_document ON movements(company_id, reference_type, reference_id);

-- Auto-match candidate pool
CREATE INDEX idx_movements_unmatched_bank ON movements(bank_account_id)
    WHERE state = 'CONFIRMED' AND reconciled_item_id IS NULL;

-- Cash closings (arqueo)
CREATE TABLE cash_closings (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    cash_account_id UUID NOT NULL REFERENCES cash_accounts(id),
    date DATE NOT NULL,
    cash_balance NUMERIC(19, 4) NOT NULL,
    portfolio_balance NUMERIC(19, 4) NOT NULL,
    system_balance NUMERIC(19, 4) NOT NULL,
    counted NUMERIC(19, 4) NOT NULL,
    variance NUMERIC(19, 4) NOT NULL,
    state VARCHAR(16) NOT NULL,
    note TEXT,
    adjustment_movement_id UUID REFERENCES movements(id),
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    approved_by UUID,
    approved_at TIMESTAMPTZ,
    CONSTRAINT chk_closing_state CHECK (state IN ('PENDING', 'APPROVED')),
    CONSTRAINT chk_closing_variance CHECK (variance = counted - system_balance)
);

-- One closing waiting for approval per drawer
CREATE UNIQUE INDEX idx_cash_closings_pending ON cash_closings(cash_account_id)
    WHERE state = 'PENDING';

CREATE TABLE bank_statements (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    bank_account_id UUID NOT NULL REFERENCES bank_accounts(id),
    period_start DATE NOT NULL,
    period_end DATE NOT NULL,
    imported_by UUID NOT NULL,
    imported_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE bank_statement_items (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    statement_id UUID NOT NULL REFERENCES bank_statements(id) ON DELETE CASCADE,
    bank_account_id UUID NOT NULL REFERENCES bank_accounts(id),
    date DATE NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    reference TEXT,
    debit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit NUMERIC(19, 4) NOT NULL DEFAULT 0,
    status VARCHAR(16) NOT NULL,
    match_type VARCHAR(16),
    confidence NUMERIC(5, 4),
    movement_id UUID REFERENCES movements(id),
    suspense_note TEXT,
    reconciled_at TIMESTAMPTZ,
    reconciled_by UUID,
    CONSTRAINT chk_item_one_side CHECK (
        debit >= 0 AND credit >= 0 AND ((debit > 0) <> (credit > 0))
    ),
    CONSTRAINT chk_item_status CHECK (status IN ('UNRECONCILED', 'RECONCILED', 'SUSPENSE')),
    CONSTRAINT chk_item_confidence CHECK (confidence IS NULL OR confidence BETWEEN 0 AND 1),
    CONSTRAINT chk_item_link CHECK ((status = 'RECONCILED') = (movement_id IS NOT NULL))
);

CREATE INDEX idx_statement_items_statement ON bank_statement_items(statement_id, date);

-- Each side of a match links at most one record
CREATE UNIQUE INDEX idx_statement_items_movement ON bank_statement_items(movement_id)
    WHERE movement_id IS NOT NULL;

ALTER TABLE movements
    ADD CONSTRAINT fk_movements_reconciled_item
    FOREIGN KEY (reconciled_item_id) REFERENCES bank_statement_items(id);

CREATE UNIQUE INDEX idx_movements_reconciled_item ON movements(reconciled_item_id)
    WHERE reconciled_item_id IS NOT NULL;
";
