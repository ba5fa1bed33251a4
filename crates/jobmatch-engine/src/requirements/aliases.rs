//! Canonical skill table
//!
//! Maps a canonical skill name to the alias spellings seen in vacancy texts.
//! Matching is token-based, so multi-word aliases ("docker compose") match as
//! contiguous token sequences.

/// Canonical skill name paired with its alias spellings.
pub const SKILL_ALIASES: &[(&str, &[&str])] = &[
    ("Python", &["python"]),
    ("FastAPI", &["fastapi"]),
    ("Django", &["django"]),
    ("Flask", &["flask"]),
    ("PostgreSQL", &["postgresql", "postgres"]),
    ("Redis", &["redis"]),
    ("Kafka", &["kafka"]),
    ("RabbitMQ", &["rabbitmq", "rabbit mq"]),
    ("Celery", &["celery"]),
    ("Docker", &["docker"]),
    ("Docker Compose", &["docker compose", "docker-compose"]),
    ("Kubernetes", &["kubernetes", "k8s"]),
    ("React", &["react"]),
    ("TypeScript", &["typescript", "type script"]),
    ("Airflow", &["airflow"]),
    ("Prometheus", &["prometheus"]),
    ("Grafana", &["grafana"]),
    ("gRPC", &["grpc", "g rpc"]),
    ("REST", &["rest", "rest api"]),
    ("WebSocket", &["websocket", "web socket"]),
    ("Django REST Framework", &["drf", "django rest framework"]),
    (
        "ООП",
        &["ооп", "oop", "object oriented programming", "object-oriented programming"],
    ),
    (
        "async",
        &["async", "asyncio", "асинхрон", "асинхронность", "асинхронное", "асинхронный"],
    ),
    ("pytest", &["pytest", "py test"]),
    ("Git", &["git"]),
];
