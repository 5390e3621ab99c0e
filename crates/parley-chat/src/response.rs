//! Fixed responses used when no skill produced one.

use parley_core::Language;

/// Reply for a turn no skill handled.
pub fn not_understood(language: &Language) -> &'static str {
    match language.code() {
        "es" => "Lo siento, no sé cómo ayudarte con eso todavía.",
        "fr" => "Désolé, je ne sais pas encore t'aider avec ça.",
        "pt" => "Desculpe, ainda não sei como ajudar com isso.",
        _ => "Sorry, I don't know how to help with that yet.",
    }
}

/// Reply for a turn that ran past its time budget.
pub fn timed_out(language: &Language) -> &'static str {
    match language.code() {
        "es" => "Lo siento, he tardado demasiado en responder. ¿Puedes repetirlo?",
        "fr" => "Désolé, j'ai mis trop de temps à répondre. Peux-tu répéter ?",
        "pt" => "Desculpe, demorei demais para responder. Pode repetir?",
        _ => "Sorry, that took me too long. Could you say it again?",
    }
}
