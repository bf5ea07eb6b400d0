use crate::actions::DashboardView;
use crate::models::{DAY_COUNT, TaskName};

pub fn render_signed_out() -> String {
    page("Totus Tuus", SIGNED_OUT_BODY)
}

pub fn render_dashboard(view: &DashboardView) -> String {
    let tasks: String = TaskName::ALL
        .iter()
        .map(|task| {
            let done = view.today.get(*task);
            format!(
                r#"<li class="task{class}"><span>{label}</span><button data-task="{name}" data-done="{done}">{action}</button></li>"#,
                class = if done { " done" } else { "" },
                label = task_label(*task),
                name = task.label(),
                action = if done { "Completed" } else { "Pending" },
            )
        })
        .collect();

    let countdown = match &view.countdown {
        Some(remaining) => format!(
            r#"<p class="countdown" data-secs="{}">Next day unlocks in <strong>{remaining}</strong></p>"#,
            view.countdown_secs.unwrap_or_default()
        ),
        None => String::new(),
    };

    let start_day = if view.can_choose_start_day {
        START_DAY_FORM.to_string()
    } else {
        String::new()
    };

    let body = DASHBOARD_BODY
        .replace("{{DAY}}", &view.available_day.to_string())
        .replace("{{TOTAL}}", &DAY_COUNT.to_string())
        .replace("{{PERCENT}}", &view.summary.percentage.to_string())
        .replace("{{REMAINING}}", &view.summary.days_remaining.to_string())
        .replace("{{TASKS}}", &tasks)
        .replace("{{COUNTDOWN}}", &countdown)
        .replace("{{LIBRE}}", if view.user.libre_mode { "true" } else { "false" })
        .replace(
            "{{LIBRE_LABEL}}",
            if view.user.libre_mode { "Disable libre mode" } else { "Enable libre mode" },
        )
        .replace("{{START_DAY}}", &start_day)
        .replace("{{NAME}}", &escape(&view.user.name));
    page("Totus Tuus - Dashboard", &body)
}

pub fn render_calendar(view: &DashboardView) -> String {
    let cells: String = view
        .day_states
        .iter()
        .map(|state| {
            let mut classes = vec!["day"];
            if state.is_completed {
                classes.push("completed");
            }
            if !state.is_available {
                classes.push("locked");
            }
            if state.day == view.available_day {
                classes.push("current");
            }
            format!(
                r#"<div class="{}"><span class="number">{}</span><span class="status">{}</span></div>"#,
                classes.join(" "),
                state.day,
                if state.is_completed {
                    "done"
                } else if state.is_available {
                    "open"
                } else {
                    "locked"
                }
            )
        })
        .collect();

    let body = CALENDAR_BODY
        .replace("{{COMPLETED}}", &view.summary.completed_days.to_string())
        .replace("{{MEDITATIONS}}", &view.summary.meditations.to_string())
        .replace("{{VIDEOS}}", &view.summary.videos.to_string())
        .replace("{{ROSARIES}}", &view.summary.rosaries.to_string())
        .replace("{{CELLS}}", &cells);
    page("Totus Tuus - Calendar", &body)
}

fn task_label(task: TaskName) -> &'static str {
    match task {
        TaskName::Meditation => "Today's meditation",
        TaskName::Video => "Formation video",
        TaskName::Rosary => "Holy Rosary",
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn page(title: &str, body: &str) -> String {
    LAYOUT_HTML
        .replace("{{TITLE}}", &escape(title))
        .replace("{{BODY}}", body)
}

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <style>
    :root {
      --bg: #fdfbf3;
      --ink: #2b2a28;
      --gold: #c8961e;
      --green: #2d7a4b;
      --card: #ffffff;
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: linear-gradient(180deg, #fff8e1, var(--bg));
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      display: grid;
      place-items: start center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(860px, 100%);
      background: var(--card);
      border-radius: 24px;
      box-shadow: 0 24px 60px rgba(120, 90, 20, 0.15);
      padding: 32px;
      display: grid;
      gap: 24px;
    }

    nav {
      display: flex;
      gap: 16px;
    }

    nav a {
      color: var(--gold);
      font-weight: 600;
      text-decoration: none;
    }

    .bar {
      height: 12px;
      border-radius: 999px;
      background: #fcefc7;
      overflow: hidden;
    }

    .bar > div {
      height: 100%;
      background: var(--gold);
    }

    .tasks {
      list-style: none;
      padding: 0;
      display: grid;
      gap: 12px;
    }

    .task {
      display: flex;
      justify-content: space-between;
      align-items: center;
      padding: 14px 18px;
      border: 1px solid #f2e2b0;
      border-radius: 14px;
    }

    .task.done {
      border-color: var(--green);
      background: #eef8f1;
    }

    button {
      border: none;
      border-radius: 999px;
      padding: 10px 18px;
      font-weight: 600;
      cursor: pointer;
      background: var(--gold);
      color: white;
    }

    .grid {
      display: grid;
      grid-template-columns: repeat(auto-fill, minmax(90px, 1fr));
      gap: 10px;
    }

    .day {
      border: 1px solid #eee0b8;
      border-radius: 12px;
      padding: 12px;
      display: grid;
      gap: 4px;
      text-align: center;
    }

    .day.completed {
      background: #eef8f1;
      border-color: var(--green);
    }

    .day.current {
      outline: 2px solid var(--gold);
    }

    .day.locked {
      opacity: 0.5;
    }

    .status-line {
      min-height: 1.2em;
    }

    .status-line[data-type="error"] {
      color: #c63b2b;
    }

    .status-line[data-type="success"] {
      color: var(--green);
    }
  </style>
</head>
<body>
  <main class="app">
    {{BODY}}
    <p class="status-line" id="status"></p>
  </main>
  <script>
    const statusEl = document.getElementById("status");

    function showStatus(message, type) {
      statusEl.textContent = message;
      statusEl.dataset.type = type;
    }

    async function send(method, path, body) {
      const response = await fetch(path, {
        method,
        headers: { "Content-Type": "application/json" },
        body: body === undefined ? undefined : JSON.stringify(body),
      });
      if (!response.ok) {
        throw new Error(await response.text());
      }
      const text = await response.text();
      return text ? JSON.parse(text) : null;
    }

    async function pollNotices() {
      try {
        const notices = await send("GET", "/api/notifications");
        if (notices && notices.length) {
          const last = notices[notices.length - 1];
          showStatus(last.message, last.kind);
        }
      } catch (_) {}
    }

    setInterval(pollNotices, 1000);
  </script>
</body>
</html>
"#;

const SIGNED_OUT_BODY: &str = r#"<header>
      <h1>Total Consecration to Jesus through Mary</h1>
      <p>A 33-day journey of prayer, meditation and the Holy Rosary.</p>
    </header>
    <form id="login">
      <h2>Sign in</h2>
      <input name="email" type="email" placeholder="Email" required />
      <input name="password" type="password" placeholder="Password" required />
      <button type="submit">Sign in</button>
    </form>
    <form id="register">
      <h2>Create account</h2>
      <input name="name" placeholder="Name" required />
      <input name="email" type="email" placeholder="Email" required />
      <input name="password" type="password" placeholder="Password" required />
      <input name="confirm_password" type="password" placeholder="Confirm password" required />
      <button type="submit">Register</button>
    </form>
    <script>
      for (const id of ["login", "register"]) {
        document.getElementById(id).addEventListener("submit", async (event) => {
          event.preventDefault();
          const body = Object.fromEntries(new FormData(event.target));
          try {
            await send("POST", `/api/auth/${id}`, body);
            window.location.href = "/";
          } catch (err) {
            showStatus(err.message, "error");
          }
        });
      }
    </script>"#;

const DASHBOARD_BODY: &str = r#"<header>
      <nav><a href="/">Dashboard</a><a href="/calendar">Calendar</a><a href="/" id="logout">Sign out</a></nav>
      <h1>Good day, {{NAME}}!</h1>
      <p>Day {{DAY}} of {{TOTAL}} &middot; {{PERCENT}}% &middot; {{REMAINING}} days remaining</p>
      <div class="bar"><div style="width: {{PERCENT}}%"></div></div>
    </header>
    {{COUNTDOWN}}
    <ul class="tasks">{{TASKS}}</ul>
    <section>
      <button id="libre" data-libre="{{LIBRE}}">{{LIBRE_LABEL}}</button>
    </section>
    {{START_DAY}}
    <script>
      const day = {{DAY}};
      for (const button of document.querySelectorAll("[data-task]")) {
        button.addEventListener("click", async () => {
          const completed = button.dataset.done !== "true";
          button.dataset.done = String(completed);
          button.textContent = completed ? "Completed" : "Pending";
          try {
            await send("POST", "/api/progress/toggle", { day, task: button.dataset.task, completed });
          } catch (err) {
            showStatus(err.message, "error");
          }
        });
      }
      document.getElementById("libre").addEventListener("click", async (event) => {
        const libre_mode = event.target.dataset.libre !== "true";
        try {
          await send("PUT", "/api/libre-mode", { libre_mode });
          window.location.reload();
        } catch (err) {
          showStatus(err.message, "error");
        }
      });
      document.getElementById("logout").addEventListener("click", async (event) => {
        event.preventDefault();
        await send("POST", "/api/auth/logout");
        window.location.href = "/";
      });
      const countdown = document.querySelector(".countdown");
      if (countdown) {
        let secs = Number(countdown.dataset.secs);
        setInterval(() => {
          secs -= 1;
          if (secs <= 0) {
            window.location.reload();
            return;
          }
          const pad = (n) => String(n).padStart(2, "0");
          countdown.querySelector("strong").textContent =
            `${pad(Math.floor(secs / 3600))}:${pad(Math.floor((secs % 3600) / 60))}:${pad(secs % 60)}`;
        }, 1000);
      }
    </script>"#;

const START_DAY_FORM: &str = r#"<form id="start-day">
      <h2>Choose your start day</h2>
      <p>This can only be done once.</p>
      <input name="start_day" type="number" min="1" max="33" value="1" />
      <button type="submit">Confirm</button>
    </form>
    <script>
      document.getElementById("start-day").addEventListener("submit", async (event) => {
        event.preventDefault();
        const start_day = Number(new FormData(event.target).get("start_day"));
        try {
          await send("POST", "/api/start-day", { start_day });
          window.location.reload();
        } catch (err) {
          showStatus(err.message, "error");
        }
      });
    </script>"#;

const CALENDAR_BODY: &str = r#"<header>
      <nav><a href="/">Dashboard</a><a href="/calendar">Calendar</a></nav>
      <h1>Consecration Calendar</h1>
    </header>
    <section class="summary">
      <p><strong>{{COMPLETED}}</strong> days completed &middot; <strong>{{MEDITATIONS}}</strong> meditations &middot; <strong>{{VIDEOS}}</strong> videos &middot; <strong>{{ROSARIES}}</strong> rosaries</p>
    </section>
    <section class="grid">{{CELLS}}</section>"#;
