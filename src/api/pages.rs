//! Placeholder pages so the edge guard has somewhere to send people.

use axum::response::Html;

pub async fn home() -> Html<&'static str> {
    Html("<h1>Courses</h1>")
}

pub async fn login() -> Html<&'static str> {
    Html("<h1>Sign in</h1>")
}

pub async fn signup() -> Html<&'static str> {
    Html("<h1>Create an account</h1>")
}

pub async fn admin() -> Html<&'static str> {
    Html("<h1>Admin</h1>")
}
