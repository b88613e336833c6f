//! HTML rendering for the transaction feed.

use std::collections::HashMap;

use maud::{Markup, html};

use crate::{
    Error,
    database_id::TransactionId,
    feed::FeedView,
    money::format_currency,
    selection::SelectionState,
    transaction::{
        Calendar, DayGroup, Direction, DirectionDisplay, SelectionSummary, Transaction,
        categorization_status, merchant_status,
    },
};

const LIST_CONTAINER_STYLE: &str = "rounded bg-gray-50 dark:bg-gray-800 overflow-hidden \
    lg:max-w-5xl lg:w-full lg:mx-auto";
const DAY_HEADER_STYLE: &str = "flex items-center justify-between gap-3 px-4 py-2 \
    bg-gray-100 dark:bg-gray-900 cursor-pointer select-none";
const ROW_STYLE: &str = "flex items-center justify-between gap-3 px-4 py-3 \
    border-b border-gray-200 dark:border-gray-700 cursor-pointer";
const SELECTED_ROW_STYLE: &str = "bg-blue-50 dark:bg-blue-900/30";
const STATUS_BADGE_STYLE: &str = "inline-flex items-center rounded-full px-2 py-0.5 \
    text-xs font-medium bg-gray-200 text-gray-700 dark:bg-gray-700 dark:text-gray-200";
const FOOTER_STYLE: &str = "px-4 py-3 text-center text-sm text-gray-500 dark:text-gray-400";

/// The number of placeholder rows shown while the first page loads.
const SKELETON_ROWS: usize = 6;

fn amount_class(amount: f64) -> &'static str {
    if amount < 0.0 {
        "text-red-700 dark:text-red-300"
    } else {
        "text-green-700 dark:text-green-300"
    }
}

fn transaction_count_label(count: usize) -> String {
    if count == 1 {
        "1 transaction".to_owned()
    } else {
        format!("{count} transactions")
    }
}

/// The state of changes made from the list, shown above its rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct MutationStatus<'a> {
    /// The error of the last failed create, update or delete.
    pub error: Option<&'a Error>,
    /// Whether a change is waiting on the service.
    pub is_pending: bool,
}

/// Render the feed grouped into `groups`, with the rows in `selection` highlighted.
///
/// `account_scoped` changes the empty state text for lists limited to one account.
pub fn transaction_list_view(
    feed: &FeedView,
    groups: &[DayGroup],
    selection: &SelectionState,
    calendar: &Calendar,
    account_scoped: bool,
    mutation: MutationStatus,
) -> Markup {
    let global_indices: HashMap<TransactionId, usize> = feed
        .items
        .iter()
        .enumerate()
        .map(|(index, transaction)| (transaction.id, index))
        .collect();
    let selected = selection.selected_in(&feed.items);
    let show_empty_state =
        !feed.is_loading && !feed.has_more && feed.items.is_empty() && feed.error.is_none();

    html! {
        section class=(LIST_CONTAINER_STYLE) id="transaction-list" data-session=(feed.session)
        {
            @if let Some(error) = &feed.error {
                (error_banner(error))
            }

            @if let Some(error) = mutation.error {
                (mutation_error_banner(error))
            }

            @if mutation.is_pending {
                p class=(FOOTER_STYLE) data-mutation-pending="true" aria-live="polite" { "saving changes..." }
            }

            @if !selected.is_empty() {
                (selection_summary_card(
                    &SelectionSummary::from_transactions(selected.iter().copied()),
                    selected.first().map(|transaction| transaction.amount.currency_code.as_str()),
                ))
            }

            @if feed.is_loading {
                (loading_skeleton())
            } @else if show_empty_state {
                (empty_state(account_scoped))
            } @else {
                @for group in groups {
                    (day_section(group, selection, &global_indices, calendar))
                }

                (list_footer(feed))
            }
        }
    }
}

fn loading_skeleton() -> Markup {
    html! {
        div class="animate-pulse space-y-2 p-4" data-loading="true" aria-busy="true"
        {
            @for _ in 0..SKELETON_ROWS {
                div class="h-10 rounded bg-gray-200 dark:bg-gray-700" {}
            }
        }
    }
}

fn error_banner(error: &Error) -> Markup {
    html! {
        div
            class="m-4 rounded border border-red-300 bg-red-50 px-4 py-3 text-sm text-red-800 dark:border-red-700 dark:bg-red-900/30 dark:text-red-200"
            role="alert"
            data-error="true"
        {
            p class="font-semibold" { "could not load transactions" }
            p { (error) }
        }
    }
}

fn mutation_error_banner(error: &Error) -> Markup {
    html! {
        div
            class="m-4 rounded border border-red-300 bg-red-50 px-4 py-3 text-sm text-red-800 dark:border-red-700 dark:bg-red-900/30 dark:text-red-200"
            role="alert"
            data-mutation-error="true"
        {
            p class="font-semibold" { "your changes could not be saved" }
            p { (error) }
        }
    }
}

fn empty_state(account_scoped: bool) -> Markup {
    let description = if account_scoped {
        "transactions for this account will appear here once they are imported or added."
    } else {
        "transactions will appear here once they are imported or added."
    };

    html! {
        div class="px-6 py-10 text-center" data-empty-state="true"
        {
            p class="font-semibold text-gray-900 dark:text-white" { "no transactions yet" }
            p class="mt-1 text-sm text-gray-500 dark:text-gray-400" { (description) }
        }
    }
}

fn day_section(
    group: &DayGroup,
    selection: &SelectionState,
    global_indices: &HashMap<TransactionId, usize>,
    calendar: &Calendar,
) -> Markup {
    let currency_code = group.currency_code.as_deref();
    let hint = selection.has_selection().then_some(
        "ctrl/cmd-click to toggle this day, shift-click to select up to the end of this day",
    );

    html! {
        section data-day=(group.date_key)
        {
            header class=(DAY_HEADER_STYLE) data-day-header=(group.date_key) title=[hint]
            {
                div
                {
                    h2 class="font-semibold text-gray-900 dark:text-white" { (group.display_label) }
                    span class="text-xs text-gray-500 dark:text-gray-400" data-day-count="true"
                    {
                        (transaction_count_label(group.transactions.len()))
                    }
                }

                div class="flex gap-3 text-sm"
                {
                    span class="text-green-700 dark:text-green-300" data-day-incoming="true"
                    {
                        "in " (format_currency(group.total_incoming, currency_code))
                    }
                    span class="text-red-700 dark:text-red-300" data-day-outgoing="true"
                    {
                        "out " (format_currency(group.total_outgoing, currency_code))
                    }
                    span class={ "font-semibold " (amount_class(group.net)) } data-day-net="true"
                    {
                        (format_currency(group.net, currency_code))
                    }
                }
            }

            ul
            {
                @for transaction in &group.transactions {
                    @if let Some(index) = global_indices.get(&transaction.id) {
                        (transaction_row(transaction, *index, selection.is_selected(transaction.id), calendar))
                    }
                }
            }
        }
    }
}

fn transaction_row(
    transaction: &Transaction,
    global_index: usize,
    is_selected: bool,
    calendar: &Calendar,
) -> Markup {
    let direction = DirectionDisplay::from(transaction.direction);
    let amount = format_currency(
        transaction.amount.to_display(),
        Some(&transaction.amount.currency_code),
    );
    let row_class = if is_selected {
        format!("{ROW_STYLE} {SELECTED_ROW_STYLE}")
    } else {
        ROW_STYLE.to_owned()
    };
    let amount_class = match transaction.direction {
        Direction::Incoming => "text-green-700 dark:text-green-300",
        Direction::Outgoing => "text-gray-900 dark:text-white",
    };

    html! {
        li
            class=(row_class)
            data-id=(transaction.id)
            data-index=(global_index)
            data-selected=[is_selected.then_some("true")]
            aria-selected=(is_selected)
        {
            div class="min-w-0"
            {
                p class="truncate font-medium text-gray-900 dark:text-white" { (transaction.title()) }
                p class="text-xs text-gray-500 dark:text-gray-400"
                {
                    time { (calendar.format_time(transaction.occurred_at.as_ref())) }
                    @if let Some(description) = transaction.merchant.as_ref().and(transaction.description.as_ref()) {
                        " · " (description)
                    }
                }
            }

            div class="flex items-center gap-2"
            {
                span class=(STATUS_BADGE_STYLE) data-category-status=(categorization_status(transaction).as_str())
                {
                    "category: " (categorization_status(transaction).as_str())
                }
                span class=(STATUS_BADGE_STYLE) data-merchant-status=(merchant_status(transaction).as_str())
                {
                    "merchant: " (merchant_status(transaction).as_str())
                }
                span class={ "font-semibold tabular-nums " (amount_class) } data-direction=(direction.label)
                {
                    (direction.symbol) (amount)
                }
            }
        }
    }
}

fn list_footer(feed: &FeedView) -> Markup {
    html! {
        @if feed.is_loading_more {
            p class=(FOOTER_STYLE) data-loading-more="true" { "loading more..." }
        } @else if feed.has_more {
            div id="load-more-sentinel" data-sentinel="true" class="h-px" {}
        } @else if !feed.items.is_empty() {
            p class=(FOOTER_STYLE) data-end-of-list="true" { "all transactions loaded" }
        }
    }
}

/// Render totals for the selected transactions.
pub fn selection_summary_card(summary: &SelectionSummary, currency_code: Option<&str>) -> Markup {
    html! {
        aside class="m-4 rounded border border-blue-200 bg-white p-4 shadow-sm dark:border-blue-800 dark:bg-gray-900" data-selection-summary="true"
        {
            h2 class="font-semibold text-gray-900 dark:text-white"
            {
                (transaction_count_label(summary.count)) " selected"
            }

            dl class="mt-2 grid grid-cols-2 gap-x-4 gap-y-1 text-sm"
            {
                dt { "income" }
                dd class="text-right text-green-700 dark:text-green-300" data-summary-income="true"
                {
                    (format_currency(summary.total_income, currency_code))
                    " (" (format!("{:.0}%", summary.income_percentage)) ")"
                }
                dt { "expenses" }
                dd class="text-right text-red-700 dark:text-red-300" data-summary-expenses="true"
                {
                    (format_currency(summary.total_expenses, currency_code))
                    " (" (format!("{:.0}%", summary.expense_percentage)) ")"
                }
                dt { "net" }
                dd class={ "text-right font-semibold " (amount_class(summary.net)) } data-summary-net="true"
                {
                    (format_currency(summary.net, currency_code))
                }
                dt { "average" }
                dd class="text-right" { (format_currency(summary.average_per_transaction, currency_code)) }
            }
        }
    }
}
