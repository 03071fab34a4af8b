mod discovery;
mod lifecycle;
