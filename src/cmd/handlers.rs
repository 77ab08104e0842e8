/*!
handlers.rs

Command table for `slackcli`.

Most commands are thin: read positional arguments, build a form, call one
remote method, render the JSON answer. Those are declared as data in
`OPERATIONS` and share a single handler (`call_operation`). Commands with
extra behavior (help, version, robot messages, attachment parsing, id
lookups, the event stream) have bespoke handlers below the table.

Parameter kinds:
  Text(field)          positional string, sent only when non-empty
  Number(field, dflt)  positional base-10 integer, `dflt` when absent/malformed
  Flag(field)          positional, "true" -> true, anything else -> false
  Fixed(field, value)  constant; not positional, not shown in help

Positional indices follow declaration order starting at 1 (index 0 is the
command name).
*/

use std::io::Write;

use serde_json::{Value, json};

use super::dispatch::{Context, write_builtin_help};
use super::events::rtm_events;
use super::registry::Registry;
use super::render::{render, render_failure};
use super::{Arguments, HELP_COMMAND};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Text(&'static str),
    Number(&'static str, i64),
    Flag(&'static str),
    Fixed(&'static str, &'static str),
}

impl Param {
    fn label(&self) -> Option<&'static str> {
        match *self {
            Param::Text(f) | Param::Number(f, _) | Param::Flag(f) => Some(f),
            Param::Fixed(..) => None,
        }
    }
}

#[derive(Debug)]
pub struct Operation {
    /// Command name on the command line.
    pub name: &'static str,
    /// Remote method called.
    pub method: &'static str,
    pub params: &'static [Param],
    pub help: &'static str,
}

impl Operation {
    pub fn labels(&self) -> Vec<&'static str> {
        self.params.iter().filter_map(Param::label).collect()
    }

    /// Form fields for one invocation.
    pub fn form(&self, args: &Arguments) -> Vec<(String, String)> {
        let mut form = Vec::with_capacity(self.params.len());
        let mut index = 1;
        for param in self.params {
            match *param {
                Param::Text(field) => {
                    let value = args.get(index);
                    if !value.is_empty() {
                        form.push((field.to_string(), value.to_string()));
                    }
                    index += 1;
                }
                Param::Number(field, default) => {
                    form.push((field.to_string(), args.number(index, default).to_string()));
                    index += 1;
                }
                Param::Flag(field) => {
                    form.push((field.to_string(), args.flag(index).to_string()));
                    index += 1;
                }
                Param::Fixed(field, value) => {
                    form.push((field.to_string(), value.to_string()));
                }
            }
        }
        form
    }
}

use self::Param::{Fixed, Flag, Number, Text};

macro_rules! op {
    ($name:literal, $help:literal $(, $param:expr)* $(,)?) => {
        op!($name => $name, $help $(, $param)*)
    };
    ($name:literal => $method:literal, $help:literal $(, $param:expr)* $(,)?) => {
        Operation {
            name: $name,
            method: $method,
            params: &[$($param),*],
            help: $help,
        }
    };
}

const SEARCH_ORDER: [Param; 2] = [Fixed("sort", "timestamp"), Fixed("sort_dir", "desc")];

#[rustfmt::skip]
pub const OPERATIONS: &[Operation] = &[
    op!("api.test", "Checks API calling code", Text("error")),
    op!("apps.connections.open", "Generates a temporary Socket Mode WebSocket URL"),
    op!("apps.event.authorizations.list", "Lists the authorizations for an event context",
        Text("event_context"), Text("cursor"), Number("limit", 100)),
    op!("apps.list", "Lists associated applications"),
    op!("apps.manifest.create", "Creates an app from a manifest", Text("manifest")),
    op!("apps.manifest.delete", "Permanently deletes an app", Text("app_id")),
    op!("apps.manifest.export", "Exports an app manifest", Text("app_id")),
    op!("apps.manifest.update", "Updates an app from a manifest", Text("app_id"), Text("manifest")),
    op!("apps.manifest.validate", "Validates an app manifest", Text("app_id"), Text("manifest")),
    op!("auth.teams.list", "Lists the workspaces a token can access",
        Text("cursor"), Flag("include_icon"), Number("limit", 100)),
    op!("auth.test", "Checks authentication and identity"),
    op!("bots.info", "Gets information about a bot user", Text("bot")),
    op!("chat.delete", "Deletes a message", Text("channel"), Text("ts")),
    op!("chat.deleteAttachment", "Deletes one attachment from a message",
        Text("channel"), Text("ts"), Number("attachment", 1)),
    op!("chat.meMessage", "Share a me message into a channel", Text("channel"), Text("text")),
    op!("chat.postMessage", "Sends a message to a channel", Text("channel"), Text("text")),
    op!("chat.update", "Updates a message", Text("channel"), Text("ts"), Text("text")),
    op!("client.counts", "Counts unread messages and mentions",
        Fixed("org_wide_aware", "true"), Fixed("thread_counts_by_channel", "true")),
    op!("client.shouldReload", "Checks whether the client should reload",
        Text("team_ids"), Number("version_ts", 1), Number("build_version_ts", 1),
        Number("config_version_ts", 1)),
    op!("conversations.acceptSharedInvite", "Accepts an invitation to a shared channel",
        Text("channel_name"), Text("channel_id"), Flag("free_trial_accepted"),
        Text("invite_id"), Flag("is_private"), Text("team_id")),
    op!("conversations.approveSharedInvite", "Approves an invitation to a shared channel",
        Text("invite_id"), Text("target_team")),
    op!("conversations.archive", "Archives a conversation", Text("channel")),
    op!("conversations.close", "Closes a direct message or multi-person direct message", Text("channel")),
    op!("conversations.create", "Initiates a public or private channel-based conversation",
        Text("name"), Flag("is_private"), Text("team_id")),
    op!("conversations.declineSharedInvite", "Declines an invitation to a shared channel",
        Text("invite_id"), Text("target_team")),
    op!("conversations.delete", "Deletes a conversation", Text("channel")),
    op!("conversations.genericInfo", "Retrieves generic information about conversations", Text("channel_ids")),
    op!("conversations.history", "Fetches a conversation's history of messages and events",
        Text("channel"), Text("latest")),
    op!("conversations.info", "Retrieve information about a conversation", Text("channel")),
    op!("conversations.invite", "Invites users to a channel", Text("channel"), Text("users")),
    op!("conversations.inviteShared", "Sends an invitation to a shared channel",
        Text("channel"), Text("emails"), Flag("external_limited"), Text("user_ids")),
    op!("conversations.join", "Joins an existing conversation", Text("channel")),
    op!("conversations.kick", "Removes a user from a conversation", Text("channel"), Text("user")),
    op!("conversations.leave", "Leaves a conversation", Text("channel")),
    op!("conversations.list", "Lists all channels in a Slack team"),
    op!("conversations.listConnectInvites", "Lists shared channel invites",
        Number("count", 100), Text("cursor"), Text("team_id")),
    op!("conversations.mark", "Sets the read cursor in a channel", Text("channel"), Text("ts")),
    op!("conversations.members", "Retrieve members of a conversation",
        Text("channel"), Text("cursor"), Number("limit", 100)),
    op!("conversations.open", "Opens or resumes a direct message or multi-person direct message",
        Text("channel"), Flag("prevent_creation"), Flag("return_im"), Text("users")),
    op!("conversations.rename", "Renames a conversation", Text("channel"), Text("name")),
    op!("conversations.replies", "Retrieve a thread of messages posted to a conversation",
        Text("channel"), Text("ts"), Text("cursor"), Flag("inclusive"), Text("latest"),
        Number("limit", 1000), Text("oldest")),
    op!("conversations.setPurpose", "Sets the purpose for a conversation", Text("channel"), Text("purpose")),
    op!("conversations.setTopic", "Sets the topic for a conversation", Text("channel"), Text("topic")),
    op!("conversations.suggestions", "Lists suggested conversations"),
    op!("conversations.unarchive", "Reverses conversation archival", Text("channel")),
    op!("dnd.endDnd", "Ends the current user's Do Not Disturb session immediately"),
    op!("dnd.endSnooze", "Ends the current user's snooze mode immediately"),
    op!("dnd.info", "Retrieves a user's current Do Not Disturb status", Text("user")),
    op!("dnd.setSnooze", "Turns on Do Not Disturb mode for the current user", Number("num_minutes", 60)),
    op!("dnd.teamInfo", "Retrieves the Do Not Disturb status for users on a team", Text("users")),
    op!("emoji.list", "Lists custom emoji for a team"),
    op!("eventlog.history", "Lists all the events since the specified time", Text("start")),
    op!("files.comments.add", "Add a comment to an existing file", Text("file"), Text("comment")),
    op!("files.comments.delete", "Deletes an existing comment on a file", Text("file"), Text("id")),
    op!("files.comments.edit", "Edit an existing file comment", Text("file"), Text("id"), Text("comment")),
    op!("files.delete", "Deletes a file", Text("file")),
    op!("files.info", "Gets information about a team file",
        Text("file"), Number("count", 1000), Number("page", 1)),
    op!("files.list", "Lists and filters team files", Number("count", 1000), Number("page", 1)),
    op!("files.listAfterTime" => "files.list", "Lists files created after a timestamp",
        Text("ts_from"), Number("count", 1000), Number("page", 1)),
    op!("files.listBeforeTime" => "files.list", "Lists files created before a timestamp",
        Text("ts_to"), Number("count", 1000), Number("page", 1)),
    op!("files.listByChannel" => "files.list", "Lists files shared in a channel",
        Text("channel"), Number("count", 1000), Number("page", 1)),
    op!("files.listByType" => "files.list", "Lists files of the given types",
        Text("types"), Number("count", 1000), Number("page", 1)),
    op!("files.listByUser" => "files.list", "Lists files created by a user",
        Text("user"), Number("count", 1000), Number("page", 1)),
    op!("files.revokePublicURL", "Revokes public/external sharing access for a file", Text("file")),
    op!("files.sharedPublicURL", "Enables a file for public/external sharing", Text("file")),
    op!("help.issues.list", "List issues reported by the current user"),
    op!("migration.exchange", "Map local user IDs to global user IDs",
        Text("users"), Flag("to_old")),
    op!("pins.add", "Pins an item to a channel", Text("channel"), Text("timestamp")),
    op!("pins.list", "Lists items pinned to a channel", Text("channel")),
    op!("pins.remove", "Un-pins an item from a channel", Text("channel"), Text("timestamp")),
    op!("reactions.add", "Adds a reaction to an item", Text("channel"), Text("timestamp"), Text("name")),
    op!("reactions.get", "Gets reactions for an item", Text("channel"), Text("timestamp")),
    op!("reactions.list", "Lists reactions made by a user", Text("user")),
    op!("reactions.remove", "Removes a reaction from an item",
        Text("channel"), Text("timestamp"), Text("name")),
    op!("signup.checkEmail", "Checks if an email address is valid", Text("email")),
    op!("signup.confirmEmail", "Confirm an email address for signup", Text("email")),
    op!("search.all", "Searches for messages and files matching a query",
        Text("query"), Number("count", 100), Number("page", 1), SEARCH_ORDER[0], SEARCH_ORDER[1]),
    op!("search.channels" => "search.modules", "Search for channels matching a query",
        Fixed("module", "channels"), Text("query"), Number("count", 100), Number("page", 1),
        SEARCH_ORDER[0], SEARCH_ORDER[1], Fixed("extra_message_data", "true")),
    op!("search.files", "Searches for files matching a query",
        Text("query"), Number("count", 100), Number("page", 1), SEARCH_ORDER[0], SEARCH_ORDER[1]),
    op!("search.messages", "Searches for messages matching a query",
        Text("query"), Number("count", 100), Number("page", 1), SEARCH_ORDER[0], SEARCH_ORDER[1]),
    op!("search.modules", "Searches for items in a module matching a query",
        Text("module"), Text("query"), Number("count", 100), Number("page", 1),
        SEARCH_ORDER[0], SEARCH_ORDER[1], Fixed("extra_message_data", "true")),
    op!("search.users" => "search.modules", "Search users by name or email address",
        Fixed("module", "people"), Text("query"), Number("count", 100)),
    op!("stars.add", "Adds a star to an item", Text("channel"), Text("timestamp")),
    op!("stars.list", "Lists stars for a user", Number("count", 1000), Number("page", 1)),
    op!("stars.remove", "Removes a star from an item", Text("channel"), Text("timestamp")),
    op!("team.accessLogs", "Gets the access logs for the current team",
        Text("before"), Number("count", 1000), Number("page", 1)),
    op!("team.billableInfo", "Gets billable users information for the current team",
        Text("user"), Text("cursor")),
    op!("team.billing.info", "Reads a workspace's billing plan information"),
    op!("team.channels.info", "Retrieves information about shared channels of a team",
        Text("team_id"), Text("channel_ids"), Fixed("check_membership", "true")),
    op!("team.channels.membership", "Checks user membership of shared channels",
        Text("team_id"), Text("channel"), Text("user_ids")),
    op!("team.info", "Gets information about the current team", Text("team")),
    op!("team.integrationLogs", "Gets the integration logs for the current team",
        Text("app_id"), Text("change_type"), Text("count"), Text("page"), Text("service_id"),
        Text("team_id"), Text("user")),
    op!("team.listExternal", "Lists external teams connected through shared channels",
        Fixed("include_all_visible", "1"), Fixed("include_approved_orgs", "1")),
    op!("team.preferences.list", "Retrieve a list of a workspace's team preferences"),
    op!("team.profile.get", "Retrieve a team's profile"),
    op!("users.counts", "Count number of users in the team"),
    op!("users.deletePhoto", "Delete the user avatar"),
    op!("users.getPresence", "Gets user presence information", Text("user")),
    op!("users.identity", "Get a user's identity"),
    op!("users.info", "Gets information about a user", Text("user")),
    op!("users.list", "Lists all users in a Slack team", Number("limit", 100), Text("cursor")),
    op!("users.lookupByEmail", "Find a user with an email address", Text("email")),
    op!("users.prefs.get", "Get user account preferences"),
    op!("users.prefs.set", "Set user account preferences", Text("name"), Text("value")),
    op!("users.preparePhoto", "Upload a picture to use as the avatar", Text("image")),
    op!("users.profile.get", "Retrieves a user's profile information", Text("user")),
    op!("users.profile.set", "Set the profile information for a user", Text("name"), Text("value")),
    op!("users.setActive", "Marks a user as active"),
    op!("users.setAvatar", "Upload a picture from the Internet to use as the avatar", Text("image_url")),
    op!("users.setEmail" => "users.profile.set", "Changes the email address without confirmation",
        Fixed("name", "email"), Text("value")),
    op!("users.setPhoto", "Define which picture will be the avatar", Text("image_id")),
    op!("users.setPresence", "Manually sets user presence", Text("presence")),
    op!("users.setStatus", "Set the status of the current user", Text("emoji"), Text("text")),
    op!("users.setUsername" => "users.profile.set", "Changes the username without admin privileges",
        Fixed("name", "username"), Text("value")),
    op!("workflows.stepCompleted", "Indicate a workflow step has completed", Text("workflow_step_execute_id")),
    op!("workflows.stepFailed", "Indicate a workflow step has failed",
        Text("workflow_step_execute_id"), Text("error")),
    op!("workflows.updateStep", "Update the configuration for a workflow step",
        Text("workflow_step_edit_id"), Text("step_image_url"), Text("step_name")),
];

/// Register every command, in help order.
pub fn register_all(registry: &mut Registry) {
    for operation in OPERATIONS {
        registry.register(
            operation.name,
            move |ctx| call_operation(ctx, operation),
            &operation.labels(),
            operation.help,
        );
    }

    registry.register("auth.revoke", auth_revoke, &["test"], "Revokes a token");
    registry.register(
        "chat.postAttachment",
        chat_post_attachment,
        &["channel", "json"],
        "Sends a message with a single attachment",
    );
    registry.register(
        "chat.robotMessage",
        chat_robot_message,
        &["channel", "text"],
        "Sends a message as a robot (SLACK_ROBOT_NAME, SLACK_ROBOT_IMAGE)",
    );
    registry.register(
        "conversations.id",
        conversations_id,
        &["channel", "count", "page"],
        "Finds the ID of a channel by its name",
    );
    registry.register(
        "users.id",
        users_id,
        &["username", "limit"],
        "Finds the ID of a user by its name",
    );
    registry.register(
        "rtm.events",
        rtm_events,
        &[],
        "Prints the realtime event stream",
    );
    registry.register(
        "version",
        version,
        &[],
        "Displays the program version number",
    );
    registry.register(
        HELP_COMMAND,
        write_builtin_help,
        &[],
        "Displays usage and program options",
    );
}

/* ---- shared call path ---- */

fn call_operation(ctx: &mut Context<'_>, operation: &Operation) -> i32 {
    let form = operation.form(ctx.args);
    call_and_render(ctx, operation.name, operation.method, &form)
}

fn call_and_render(
    ctx: &mut Context<'_>,
    name: &str,
    method: &str,
    form: &[(String, String)],
) -> i32 {
    match ctx.api.call(method, form) {
        Ok(value) => render(&value, ctx.out),
        Err(e) => {
            tracing::warn!(command = name, method, error = %e, "remote call failed");
            render_failure(format!("{name}; {e}"), ctx.out)
        }
    }
}

fn pair(field: &str, value: impl Into<String>) -> (String, String) {
    (field.to_string(), value.into())
}

/* ---- bespoke handlers ---- */

fn version(ctx: &mut Context<'_>) -> i32 {
    render(
        &json!({ "ok": true, "version": env!("CARGO_PKG_VERSION") }),
        ctx.out,
    )
}

fn auth_revoke(ctx: &mut Context<'_>) -> i32 {
    let test = ctx.args.get(1) == "test";
    let form = [pair("test", test.to_string())];
    call_and_render(ctx, "auth.revoke", "auth.revoke", &form)
}

fn chat_robot_message(ctx: &mut Context<'_>) -> i32 {
    let image = &ctx.config.robot_image;
    let icon_field = if image.starts_with(':') {
        "icon_emoji"
    } else {
        "icon_url"
    };

    let mut form = vec![
        pair("channel", ctx.args.get(1)),
        pair("text", ctx.args.get(2)),
        pair("as_user", "false"),
        pair("username", ctx.config.robot_name.as_str()),
    ];
    form.push(pair(icon_field, image.as_str()));
    call_and_render(ctx, "chat.robotMessage", "chat.postMessage", &form)
}

fn chat_post_attachment(ctx: &mut Context<'_>) -> i32 {
    let attachment: Value = match serde_json::from_str(ctx.args.get(2)) {
        Ok(v) => v,
        Err(e) => return render_failure(format!("decode error: {e}"), ctx.out),
    };

    let form = [
        pair("channel", ctx.args.get(1)),
        pair("attachments", Value::Array(vec![attachment]).to_string()),
    ];
    call_and_render(ctx, "chat.postAttachment", "chat.postMessage", &form)
}

fn conversations_id(ctx: &mut Context<'_>) -> i32 {
    let channel = ctx.args.string(1, "");
    let form = [
        pair("module", "channels"),
        pair("query", channel.as_str()),
        pair("count", ctx.args.number(2, 100).to_string()),
        pair("page", ctx.args.number(3, 1).to_string()),
        pair("sort", "timestamp"),
        pair("sort_dir", "desc"),
    ];

    let value = match ctx.api.call("search.modules", &form) {
        Ok(v) => v,
        Err(e) => return render_failure(format!("conversations.id; {e}"), ctx.out),
    };
    let id = find_id(&value, "items", |item| {
        item.get("name").and_then(Value::as_str) == Some(channel.as_str())
    });
    render_lookup(ctx.out, &value, id, "channel_not_found")
}

fn users_id(ctx: &mut Context<'_>) -> i32 {
    let username = ctx.args.string(1, "");
    let form = [pair("limit", ctx.args.number(2, 100).to_string())];

    let value = match ctx.api.call("users.list", &form) {
        Ok(v) => v,
        Err(e) => return render_failure(format!("users.id; {e}"), ctx.out),
    };
    let id = find_id(&value, "members", |member| {
        member.get("name").and_then(Value::as_str) == Some(username.as_str())
    });
    render_lookup(ctx.out, &value, id, "user_not_found")
}

/// `id` of the first element of `value[list]` accepted by `matches`.
fn find_id<F>(value: &Value, list: &str, matches: F) -> Option<String>
where
    F: Fn(&Value) -> bool,
{
    value
        .get(list)?
        .as_array()?
        .iter()
        .find(|item| matches(item))?
        .get("id")?
        .as_str()
        .map(str::to_string)
}

/// Upstream failures pass through the renderer untouched; a miss becomes `not_found`.
fn render_lookup(
    out: &mut dyn Write,
    upstream: &Value,
    id: Option<String>,
    not_found: &str,
) -> i32 {
    if upstream.get("ok").and_then(Value::as_bool) == Some(false) {
        return render(upstream, out);
    }
    match id {
        Some(id) => render(&json!({ "ok": true, "id": id }), out),
        None => render_failure(not_found, out),
    }
}
